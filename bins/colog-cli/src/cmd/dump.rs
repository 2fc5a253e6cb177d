use std::io::{self, BufWriter, Write};

use colog_api::{FileReaderWriterFactory, LogFileError, LogFilePath};
use prost_reflect::DynamicMessage;

use crate::config::DumpArgs;
use crate::error::CliError;

pub fn run(args: DumpArgs) -> Result<(), CliError> {
    let factory = super::factory(&args.config)?;
    let descriptor = factory.registry().message_descriptor(&args.topic)?.clone();
    let path = LogFilePath::from_path(&args.file, &args.topic, args.offset);
    let mut reader = factory.build_file_reader(&path, None)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut printed = 0usize;
    while args.limit.is_none_or(|limit| printed < limit) {
        let Some(record) = reader.next()? else {
            break;
        };
        let message = DynamicMessage::decode(descriptor.clone(), record.value.as_slice())
            .map_err(|e| LogFileError::decode(format!("offset {}: {e}", record.offset)))?;
        writeln!(out, "{}\t{}", record.offset, serde_json::to_string(&message)?)?;
        printed += 1;
    }
    out.flush()?;
    reader.close()?;

    tracing::debug!(file = %args.file.display(), records = printed, "dump finished");
    Ok(())
}
