//! Output formatting and management
//!
//! Devices are written as they arrive, so every format here is row-oriented:
//! an aligned text table, JSON Lines, or CSV.

use crate::device::Device;
use colored::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
    /// Show the Japanese mode label instead of the English one (text only)
    pub japanese: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            colored: true,
            japanese: false,
        }
    }
}

const CSV_HEADER: [&str; 5] = ["address", "product_name", "mode_code", "mode", "mode_ja"];

enum Sink<W: Write> {
    Plain(W),
    Csv(csv::Writer<W>),
}

/// Streaming writer for identified devices
pub struct DeviceWriter<W: Write> {
    config: OutputConfig,
    sink: Sink<W>,
}

impl<W: Write> DeviceWriter<W> {
    pub fn new(writer: W, config: OutputConfig) -> Self {
        let sink = match config.format {
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(writer)),
            OutputFormat::Text | OutputFormat::Json => Sink::Plain(writer),
        };
        Self { config, sink }
    }

    /// Write the table header (text) or column names (CSV). JSON Lines has
    /// no header.
    pub fn write_header(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => writer.write_record(CSV_HEADER)?,
            Sink::Plain(writer) => {
                if self.config.format == OutputFormat::Text {
                    let header = format_row("Address", "Product Name", "Mode");
                    if self.config.colored {
                        writeln!(writer, "{}", header.bold())?;
                    } else {
                        writeln!(writer, "{}", header)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn write_device(&mut self, device: &Device) -> io::Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => {
                writer.write_record([
                    device.address.to_string().as_str(),
                    device.product_name.as_str(),
                    device.system_mode.code.to_string().as_str(),
                    device.system_mode.name,
                    device.system_mode.name_ja,
                ])?;
                // rows should show up while the scan is still running
                writer.flush()?;
            }
            Sink::Plain(writer) => {
                match self.config.format {
                    OutputFormat::Json => {
                        serde_json::to_writer(&mut *writer, device)?;
                        writeln!(writer)?;
                    }
                    _ => {
                        let mode = if self.config.japanese {
                            device.system_mode.name_ja
                        } else {
                            device.system_mode.name
                        };
                        writeln!(
                            writer,
                            "{}",
                            format_row(&device.address.to_string(), &device.product_name, mode)
                        )?;
                    }
                }
                writer.flush()?;
            }
        }
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        match self.sink {
            Sink::Csv(writer) => writer.into_inner().map_err(|e| e.into_error()),
            Sink::Plain(mut writer) => {
                writer.flush()?;
                Ok(writer)
            }
        }
    }
}

fn format_row(address: &str, product: &str, mode: &str) -> String {
    format!("{:<22}\t{:<22}\t{:<24}", address, product, mode)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mode;

    fn sample() -> Vec<Device> {
        vec![
            Device::new("192.168.10.1".parse().unwrap(), "WX3600HP", mode::LOCAL_ROUTER),
            Device::new("192.168.10.2".parse().unwrap(), "WG1200HS4", mode::BRIDGE),
        ]
    }

    fn render(config: OutputConfig) -> String {
        let mut writer = DeviceWriter::new(Vec::new(), config);
        writer.write_header().unwrap();
        for device in sample() {
            writer.write_device(&device).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_text_table() {
        let output = render(OutputConfig {
            colored: false,
            ..Default::default()
        });
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Address"));
        assert!(lines[0].contains("Product Name"));
        assert!(lines[1].starts_with("192.168.10.1"));
        assert!(lines[1].contains("WX3600HP"));
        assert!(lines[1].ends_with("Local Router"));
        assert!(lines[2].ends_with("Bridge"));
    }

    #[test]
    fn test_text_table_japanese() {
        let output = render(OutputConfig {
            colored: false,
            japanese: true,
            ..Default::default()
        });
        assert!(output.contains("ローカルルーター"));
        assert!(output.contains("ブリッジ"));
    }

    #[test]
    fn test_json_lines() {
        let output = render(OutputConfig {
            format: OutputFormat::Json,
            ..Default::default()
        });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["address"], "192.168.10.1");
        assert_eq!(value["product_name"], "WX3600HP");
        assert_eq!(value["system_mode"]["code"], 2);
        assert_eq!(value["system_mode"]["name"], "Local Router");
    }

    #[test]
    fn test_csv() {
        let output = render(OutputConfig {
            format: OutputFormat::Csv,
            ..Default::default()
        });
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "address,product_name,mode_code,mode,mode_ja");
        assert_eq!(lines[1], "192.168.10.1,WX3600HP,2,Local Router,ローカルルーター");
        assert_eq!(lines[2], "192.168.10.2,WG1200HS4,0,Bridge,ブリッジ");
    }
}
