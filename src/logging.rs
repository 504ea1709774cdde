use indicatif::MultiProgress;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Writes log lines to stderr without tearing through progress bars.
#[derive(Clone)]
struct BarAwareWriter(MultiProgress);
impl Write for BarAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
impl<'a> MakeWriter<'a> for BarAwareWriter {
    type Writer = BarAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `debug`.
pub fn init(debug: bool, bars: MultiProgress) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(BarAwareWriter(bars))
        .with_target(debug)
        .init();
}
