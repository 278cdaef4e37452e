use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use xz::write::XzEncoder;

use crate::config::UserConfig;
use crate::data::osm::{Boundary, OsmId, Tags};
use crate::data::Graph;
use crate::errors::{Error, Result};

use super::DataWriter;

const GENERATOR: &str = "geo2osm";
const XZ_LEVEL: u32 = 6;

enum Sink {
    Plain(BufWriter<File>),
    Xz(XzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(inner) => inner.write(buf),
            Sink::Xz(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(inner) => inner.flush(),
            Sink::Xz(inner) => inner.flush(),
        }
    }
}

/// Writes OSM XML 0.6. Output paths ending in `.xz` are compressed.
pub struct OsmXmlWriter {
    path: PathBuf,
    significant_digits: usize,
    add_version: bool,
    add_timestamp: bool,
    never_upload: bool,
    never_download: bool,
    locked: bool,
    timestamp: Option<String>,
    xml: Option<Writer<Sink>>,
}

impl OsmXmlWriter {
    pub fn new(path: &Path, config: &UserConfig) -> Self {
        OsmXmlWriter {
            path: path.to_path_buf(),
            significant_digits: config.significant_digits,
            add_version: config.add_version,
            add_timestamp: config.add_timestamp,
            never_upload: config.never_upload,
            never_download: config.never_download,
            locked: config.locked,
            timestamp: None,
            xml: None,
        }
    }

    fn xml(&mut self) -> Result<&mut Writer<Sink>> {
        self.xml.as_mut().ok_or_else(|| Error::from("Writer is not open"))
    }

    fn element(&self, name: &'static str, id: OsmId) -> BytesStart<'static> {
        let mut element = BytesStart::new(name);
        element.push_attribute(("id", id.to_string().as_str()));
        element.push_attribute(("visible", "true"));
        if self.add_version {
            element.push_attribute(("version", "1"));
        }
        if let Some(timestamp) = &self.timestamp {
            element.push_attribute(("timestamp", timestamp.as_str()));
        }
        element
    }

    fn coordinate(&self, value: f64) -> String {
        format!("{:.*}", self.significant_digits, value)
    }

    fn write_element(
        &mut self,
        name: &'static str,
        element: BytesStart<'static>,
        children: Vec<BytesStart<'static>>,
        tags: &Tags,
    ) -> Result<()> {
        let xml = self.xml()?;
        if children.is_empty() && tags.is_empty() {
            xml.write_event(Event::Empty(element))?;
            return Ok(());
        }

        xml.write_event(Event::Start(element))?;
        for child in children {
            xml.write_event(Event::Empty(child))?;
        }
        let mut keys: Vec<&String> = tags.keys().collect();
        keys.sort();
        for key in keys {
            let mut tag = BytesStart::new("tag");
            tag.push_attribute(("k", key.as_str()));
            tag.push_attribute(("v", tags[key].as_str()));
            xml.write_event(Event::Empty(tag))?;
        }
        xml.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

impl DataWriter for OsmXmlWriter {
    fn open(&mut self) -> Result<()> {
        let file = BufWriter::new(File::create(&self.path)?);
        let sink = match self.path.extension().and_then(|extension| extension.to_str()) {
            Some("xz") => Sink::Xz(XzEncoder::new(file, XZ_LEVEL)),
            _ => Sink::Plain(file),
        };
        self.xml = Some(Writer::new_with_indent(sink, b' ', 2));
        if self.add_timestamp {
            self.timestamp = Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
        }
        info!(path = self.path.display().to_string().as_str(); "Writing OSM XML");
        Ok(())
    }

    fn write_header(&mut self, bounds: &Boundary) -> Result<()> {
        let mut root = BytesStart::new("osm");
        root.push_attribute(("version", "0.6"));
        root.push_attribute(("generator", GENERATOR));
        if self.never_upload {
            root.push_attribute(("upload", "never"));
        }
        if self.never_download {
            root.push_attribute(("download", "never"));
        }
        if self.locked {
            root.push_attribute(("locked", "true"));
        }

        let bounds_element = bounds.is_valid().then(|| {
            let mut element = BytesStart::new("bounds");
            element.push_attribute(("minlat", self.coordinate(bounds.min_y).as_str()));
            element.push_attribute(("minlon", self.coordinate(bounds.min_x).as_str()));
            element.push_attribute(("maxlat", self.coordinate(bounds.max_y).as_str()));
            element.push_attribute(("maxlon", self.coordinate(bounds.max_x).as_str()));
            element
        });

        let xml = self.xml()?;
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml.write_event(Event::Start(root))?;
        if let Some(element) = bounds_element {
            xml.write_event(Event::Empty(element))?;
        }
        Ok(())
    }

    fn write_nodes(&mut self, graph: &Graph) -> Result<()> {
        for node in graph.nodes() {
            let mut element = self.element("node", node.id);
            element.push_attribute(("lat", self.coordinate(node.y).as_str()));
            element.push_attribute(("lon", self.coordinate(node.x).as_str()));
            self.write_element("node", element, Vec::new(), &node.tags)?;
        }
        Ok(())
    }

    fn write_ways(&mut self, graph: &Graph) -> Result<()> {
        for way in graph.ways() {
            let element = self.element("way", way.id);
            let children = way
                .nodes()
                .iter()
                .map(|node| {
                    let mut nd = BytesStart::new("nd");
                    nd.push_attribute(("ref", graph.node(*node).id.to_string().as_str()));
                    nd
                })
                .collect();
            self.write_element("way", element, children, &way.tags)?;
        }
        Ok(())
    }

    fn write_relations(&mut self, graph: &Graph) -> Result<()> {
        for relation in graph.relations() {
            let element = self.element("relation", relation.id);
            let children = relation
                .members()
                .iter()
                .map(|(member, role)| {
                    let mut child = BytesStart::new("member");
                    child.push_attribute(("type", member.kind()));
                    child.push_attribute(("ref", graph.element_id(*member).to_string().as_str()));
                    child.push_attribute(("role", role.as_str()));
                    child
                })
                .collect();
            self.write_element("relation", element, children, &relation.tags)?;
        }
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        let xml = self.xml()?;
        xml.write_event(Event::End(BytesEnd::new("osm")))?;
        xml.get_mut().write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(xml) = self.xml.take() else {
            return Ok(());
        };
        match xml.into_inner() {
            Sink::Plain(mut file) => file.flush()?,
            Sink::Xz(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}
