use std::ops::{Deref, DerefMut};

use log::error;

use crate::data::osm::Boundary;
use crate::data::Graph;
use crate::errors::Result;

pub mod osm_xml;

/// Output format. Called once per run in a fixed order:
/// `open`, `write_header`, `write_nodes`, `write_ways`, `write_relations`, `write_footer`, `close`.
pub trait DataWriter {
    fn open(&mut self) -> Result<()>;
    fn write_header(&mut self, bounds: &Boundary) -> Result<()>;
    fn write_nodes(&mut self, graph: &Graph) -> Result<()>;
    fn write_ways(&mut self, graph: &Graph) -> Result<()>;
    fn write_relations(&mut self, graph: &Graph) -> Result<()>;
    fn write_footer(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// An opened writer. The writer is closed when the session is dropped, even after a failed write.
pub struct WriterSession<'a> {
    writer: &'a mut dyn DataWriter,
    closed: bool,
}

impl<'a> WriterSession<'a> {
    pub fn open(writer: &'a mut dyn DataWriter) -> Result<Self> {
        writer.open()?;
        Ok(WriterSession {
            writer,
            closed: false,
        })
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.writer.close()
    }
}

impl<'a> Deref for WriterSession<'a> {
    type Target = dyn DataWriter + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.writer
    }
}

impl<'a> DerefMut for WriterSession<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.writer
    }
}

impl Drop for WriterSession<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.writer.close() {
            error!(err = err.message.as_str(); "Closing writer failed");
        }
    }
}
