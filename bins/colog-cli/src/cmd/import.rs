use std::fs::File;
use std::io::{BufRead, BufReader};

use colog_api::{CompressionCodec, FileReaderWriterFactory, FileWriter, KeyValue, LogFilePath};

use crate::config::ImportArgs;
use crate::error::CliError;

pub fn run(args: ImportArgs) -> Result<(), CliError> {
    let factory = super::factory(&args.config)?;
    let codec = args.codec.as_deref().map(CompressionCodec::new);
    let path = LogFilePath::from_path(&args.output, &args.topic, args.offset);
    let input = BufReader::new(File::open(&args.input)?);

    let writer = factory.build_file_writer(&path, codec.as_ref())?;
    let (records, length) = import_lines(input, writer, args.offset)?;

    tracing::info!(
        output = %args.output.display(),
        topic = %args.topic,
        records,
        length,
        "import finished"
    );
    Ok(())
}

/// Copy `input` into `writer`, then close it. Rows written before a failing
/// line still form a readable file; the line's error is reported over any
/// error from closing.
fn import_lines(
    input: impl BufRead,
    mut writer: Box<dyn FileWriter>,
    first_offset: u64,
) -> Result<(u64, u64), CliError> {
    let written = copy_lines(input, writer.as_mut(), first_offset);
    let length = writer.length();
    let closed = writer.close();
    let records = written?;
    closed?;
    Ok((records, length))
}

/// Write every non-blank line as one record. Returns the record count.
fn copy_lines(
    input: impl BufRead,
    writer: &mut dyn FileWriter,
    first_offset: u64,
) -> Result<u64, CliError> {
    let mut offset = first_offset;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writer
            .write(&KeyValue::new(offset, line.into_bytes()))
            .map_err(|e| CliError::Input {
                line: index + 1,
                detail: e.to_string(),
            })?;
        offset += 1;
    }
    Ok(offset - first_offset)
}
