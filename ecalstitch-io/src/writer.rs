//! Writers for stitched images and the monitor profile.

use crate::{Error, Result};
use ecalstitch_algorithms::MonitorSnapshot;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Destination for per-event images.
pub trait ImageSink {
    /// Writes one full image.
    ///
    /// # Errors
    /// Returns an error if the image cannot be written.
    fn write_image(&mut self, image: &[f32]) -> Result<()>;

    /// Flushes buffered output.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    fn flush(&mut self) -> Result<()>;
}

/// In-memory sink, mostly for tests and small runs.
impl ImageSink for Vec<Vec<f32>> {
    fn write_image(&mut self, image: &[f32]) -> Result<()> {
        self.push(image.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// On-disk image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Little-endian f32, images back to back with no header.
    #[default]
    Binary,
    /// One comma-separated line per image.
    Csv,
}

/// Image file writer.
///
/// Every image must have the length given at creation, so a binary file is
/// always a whole number of images.
pub struct ImageFileWriter {
    writer: BufWriter<File>,
    format: ImageFormat,
    image_len: usize,
    images: usize,
}

impl ImageFileWriter {
    /// Creates a writer for images of `image_len` pixels.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, format: ImageFormat, image_len: usize) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            format,
            image_len,
            images: 0,
        })
    }

    /// Number of images written.
    #[must_use]
    pub fn images_written(&self) -> usize {
        self.images
    }

    /// Output encoding.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    fn write_binary(&mut self, image: &[f32]) -> Result<()> {
        for value in image {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    fn write_csv(&mut self, image: &[f32]) -> Result<()> {
        let mut values = image.iter();
        if let Some(first) = values.next() {
            write!(self.writer, "{first}")?;
        }
        for value in values {
            write!(self.writer, ",{value}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

impl ImageSink for ImageFileWriter {
    fn write_image(&mut self, image: &[f32]) -> Result<()> {
        if image.len() != self.image_len {
            return Err(Error::InvalidFormat(format!(
                "image has {} pixels, expected {}",
                image.len(),
                self.image_len
            )));
        }
        match self.format {
            ImageFormat::Binary => self.write_binary(image)?,
            ImageFormat::Csv => self.write_csv(image)?,
        }
        self.images += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads back a binary image file written by [`ImageFileWriter`].
///
/// # Errors
/// Returns an error if the file cannot be read or its size is not a whole
/// number of images.
pub fn read_binary_images<P: AsRef<Path>>(path: P, image_len: usize) -> Result<Vec<Vec<f32>>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let image_bytes = image_len * std::mem::size_of::<f32>();
    if image_bytes == 0 || bytes.len() % image_bytes != 0 {
        return Err(Error::InvalidFormat(format!(
            "{} bytes is not a whole number of {image_len}-pixel images",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(image_bytes)
        .map(|image| {
            image
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect())
}

/// Monitor export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorFormat {
    /// Pretty-printed [`MonitorSnapshot`].
    #[default]
    Json,
    /// `iphi,ieta,mean,count,std_dev`, one non-empty bin per line.
    Csv,
}

impl MonitorFormat {
    /// Picks CSV for a `.csv` extension, JSON otherwise.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Writes the finalized monitor profile.
pub struct MonitorWriter {
    writer: BufWriter<File>,
    format: MonitorFormat,
}

impl MonitorWriter {
    /// Creates a monitor output file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, format: MonitorFormat) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            format,
        })
    }

    /// Writes the snapshot and flushes the file.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write(mut self, snapshot: &MonitorSnapshot) -> Result<()> {
        match self.format {
            MonitorFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, snapshot)?;
                writeln!(self.writer)?;
            }
            MonitorFormat::Csv => {
                writeln!(self.writer, "iphi,ieta,mean,count,std_dev")?;
                for bin in &snapshot.bins {
                    writeln!(
                        self.writer,
                        "{},{},{},{},{}",
                        bin.iphi, bin.ieta, bin.mean, bin.count, bin.std_dev
                    )?;
                }
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecalstitch_algorithms::{MonitorAccumulator, StitchLayout};
    use tempfile::NamedTempFile;

    #[test]
    fn test_binary_images() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ImageFileWriter::create(file.path(), ImageFormat::Binary, 3).unwrap();
        writer.write_image(&[1.0, 0.0, -2.5]).unwrap();
        writer.write_image(&[0.0, 0.0, 4.0]).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.images_written(), 2);

        let data = std::fs::read(file.path()).unwrap();
        // 2 images * 3 pixels * 4 bytes
        assert_eq!(data.len(), 24);
        assert_eq!(&data[8..12], &(-2.5_f32).to_le_bytes());

        let images = read_binary_images(file.path(), 3).unwrap();
        assert_eq!(images, vec![vec![1.0, 0.0, -2.5], vec![0.0, 0.0, 4.0]]);
        assert!(read_binary_images(file.path(), 4).is_err());
    }

    #[test]
    fn test_csv_images() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ImageFileWriter::create(file.path(), ImageFormat::Csv, 4).unwrap();
        writer.write_image(&[0.0, 1.5, 0.0, 2.0]).unwrap();
        writer.write_image(&[0.0; 4]).unwrap();
        writer.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["0,1.5,0,2", "0,0,0,0"]);
    }

    #[test]
    fn test_wrong_image_length() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ImageFileWriter::create(file.path(), ImageFormat::Binary, 3).unwrap();
        assert!(matches!(
            writer.write_image(&[1.0, 2.0]),
            Err(Error::InvalidFormat(_))
        ));
        assert_eq!(writer.images_written(), 0);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink: Vec<Vec<f32>> = Vec::new();
        sink.write_image(&[1.0, 2.0]).unwrap();
        ImageSink::flush(&mut sink).unwrap();
        assert_eq!(sink, vec![vec![1.0, 2.0]]);
    }

    fn snapshot() -> MonitorSnapshot {
        let mut monitor = MonitorAccumulator::new(StitchLayout::default());
        monitor.fill(190, -140, 2.0).unwrap();
        monitor.fill(190, -140, 4.0).unwrap();
        monitor.fill(0, 0, 1.5).unwrap();
        monitor.snapshot()
    }

    #[test]
    fn test_monitor_csv() {
        let file = NamedTempFile::new().unwrap();
        MonitorWriter::create(file.path(), MonitorFormat::Csv)
            .unwrap()
            .write(&snapshot())
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "iphi,ieta,mean,count,std_dev");
        assert_eq!(lines[1], "190,-140,3,2,1");
        assert_eq!(lines[2], "0,0,1.5,1,0");
    }

    #[test]
    fn test_monitor_json() {
        let file = NamedTempFile::new().unwrap();
        let expected = snapshot();
        MonitorWriter::create(file.path(), MonitorFormat::Json)
            .unwrap()
            .write(&expected)
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let parsed: MonitorSnapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_monitor_format_from_path() {
        assert_eq!(MonitorFormat::from_path(Path::new("m.CSV")), MonitorFormat::Csv);
        assert_eq!(MonitorFormat::from_path(Path::new("m.json")), MonitorFormat::Json);
        assert_eq!(MonitorFormat::from_path(Path::new("monitor")), MonitorFormat::Json);
    }
}
