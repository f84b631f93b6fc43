// Copyright 2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

/// Install a global logger writing to stderr. Debug messages (e.g. optimizer diagnostics)
/// are shown only with `verbose`, prefixed by `DEBUG:`.
pub fn setup_logger(verbose: bool) -> Result<(), failure::Error> {
    fern::Dispatch::new()
        .format(|out, msg, record| match record.level() {
            log::Level::Debug => out.finish(format_args!("DEBUG: {}", msg)),
            _ => out.finish(format_args!("{}", msg)),
        })
        .level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
