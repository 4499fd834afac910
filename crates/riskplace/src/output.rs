use std::io::{LineWriter, Stdout, Write};

use serde::Serialize;

/// Writes every report as one JSON document per line.
pub struct JsonLines<W: Write> {
    out: W,
}

impl JsonLines<LineWriter<Stdout>> {
    pub fn stdout() -> Self {
        JsonLines::new(LineWriter::new(std::io::stdout()))
    }
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        JsonLines { out }
    }

    pub fn emit<T: Serialize>(&mut self, value: &T) -> crate::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn into_inner(mut self) -> crate::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
