//! The `.btlm` file sink: `[FileHeader][schema_blob][packet x N][IndexEntry
//! x N][IndexFooter]` (spec.md §6). A thin wrapper over `drain_packed` the
//! same way `telemetry-tcp`'s server is — the only difference is the sink
//! (a file instead of a socket) and that this sink also tracks a footer
//! index so a reader can seek straight to any packet without scanning.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use telemetry_core::{Context, EntryHeader, IndexEntry, IndexFooter, PacketHeader};

use crate::error::FileError;

fn put_bytes(buf: &mut [u8], offset: &mut usize, bytes: &[u8]) {
    buf[*offset..*offset + bytes.len()].copy_from_slice(bytes);
    *offset += bytes.len();
}

/// `[magic "BTLM" (4B)][version u16][schema_len u32]`, 10 bytes total
/// (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
    magic: [u8; 4],
    version: u16,
    schema_len: u32,
}

impl FileHeader {
    const SIZE: usize = 10;
    const MAGIC: [u8; 4] = *b"BTLM";
    const VERSION: u16 = 1;

    fn encode(&self, buf: &mut [u8]) {
        let mut off = 0;
        put_bytes(buf, &mut off, &self.magic);
        put_bytes(buf, &mut off, &self.version.to_ne_bytes());
        put_bytes(buf, &mut off, &self.schema_len.to_ne_bytes());
        debug_assert_eq!(off, Self::SIZE);
    }
}

const _: () = assert!(FileHeader::SIZE == 10);

/// An open `.btlm` file: the header and schema blob have already been
/// written; `write_packet`/`drain_into` append packed batches and track
/// their offsets for the footer index written by `finalize`.
pub struct FileSink {
    file: File,
    offset: u64,
    index: Vec<IndexEntry>,
}

impl FileSink {
    /// Creates `path`, writing the `FileHeader` and the current schema blob
    /// immediately. The registry must be fully populated before this call —
    /// schemas registered afterwards are not reflected in the file.
    pub fn create<P: AsRef<Path>>(path: P, ctx: &Context) -> Result<Self, FileError> {
        let mut file = File::create(path)?;

        let schema_len = ctx.schema_serialize(None)?;
        let mut schema_buf = vec![0u8; schema_len];
        ctx.schema_serialize(Some(&mut schema_buf))?;

        let header = FileHeader {
            magic: FileHeader::MAGIC,
            version: FileHeader::VERSION,
            schema_len: schema_len as u32,
        };
        let mut header_buf = [0u8; FileHeader::SIZE];
        header.encode(&mut header_buf);
        file.write_all(&header_buf)?;
        file.write_all(&schema_buf)?;

        Ok(Self {
            file,
            offset: (FileHeader::SIZE + schema_len) as u64,
            index: Vec::new(),
        })
    }

    /// Appends one already-framed packed batch (as produced by
    /// `Context::drain_packed`) and records its footer index entry.
    pub fn write_packet(&mut self, packet: &[u8]) -> Result<(), FileError> {
        let header = PacketHeader::decode(&packet[..PacketHeader::SIZE]);
        let first_timestamp = if header.entry_count > 0 {
            EntryHeader::decode(&packet[PacketHeader::SIZE..PacketHeader::SIZE + EntryHeader::SIZE])
                .timestamp
        } else {
            0
        };

        self.file.write_all(packet)?;
        self.index.push(IndexEntry {
            packet_offset: self.offset,
            packet_len: packet.len() as u32,
            entry_count: header.entry_count,
            first_timestamp,
            dropped: header.dropped,
            reserved: 0,
        });
        self.offset += packet.len() as u64;
        Ok(())
    }

    /// Drains everything currently available from `consumer_id` through
    /// `scratch`, writing each non-empty packed batch in turn. Returns the
    /// number of packets written (zero means the consumer had nothing).
    pub fn drain_into(
        &mut self,
        ctx: &Context,
        consumer_id: usize,
        scratch: &mut [u8],
    ) -> Result<usize, FileError> {
        let mut written = 0usize;
        loop {
            let len = ctx.drain_packed(consumer_id, scratch)?;
            if len == 0 {
                break;
            }
            self.write_packet(&scratch[..len])?;
            written += 1;
        }
        Ok(written)
    }

    /// Writes the footer index and the `IndexFooter` trailer, then flushes.
    /// Consumes `self`: a finalised file is not meant to be appended to
    /// further (the spec's format has one index covering the whole file).
    pub fn finalize(mut self) -> Result<(), FileError> {
        let index_offset = self.offset;
        let index_count = u32::try_from(self.index.len()).map_err(|_| FileError::IndexOverflow)?;

        let mut entry_buf = [0u8; IndexEntry::SIZE];
        for entry in &self.index {
            entry.encode(&mut entry_buf);
            self.file.write_all(&entry_buf)?;
        }

        let footer = IndexFooter {
            magic: IndexFooter::MAGIC,
            index_offset,
            index_count,
        };
        let mut footer_buf = [0u8; IndexFooter::SIZE];
        footer.encode(&mut footer_buf);
        self.file.write_all(&footer_buf)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Drives `sink` from `consumer_id` until `shutdown` is set, sleeping
/// `poll_interval` whenever the ring has nothing new (spec.md §9 Open
/// Question 3, the same poll discipline `telemetry-tcp::serve_connection`
/// uses). Performs one last drain after `shutdown` is observed so entries
/// logged right before shutdown are not lost to the poll interval.
pub fn capture(
    ctx: &Context,
    consumer_id: usize,
    sink: &mut FileSink,
    shutdown: &AtomicBool,
    poll_interval: Duration,
) -> Result<(), FileError> {
    let mut scratch = vec![0u8; 64 * 1024];
    while !shutdown.load(Ordering::Relaxed) {
        if sink.drain_into(ctx, consumer_id, &mut scratch)? == 0 {
            thread::sleep(poll_interval);
        }
    }
    sink.drain_into(ctx, consumer_id, &mut scratch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_core::{Config, Field, FieldType, Filter, SchemaEntryDescriptor};

    fn sample_ctx() -> (Context<'static>, Box<SchemaEntryDescriptor>) {
        let descriptor = Box::new(SchemaEntryDescriptor {
            id: 0,
            name: "tick".into(),
            description: "periodic tick".into(),
            payload_size: 4,
            fields: vec![Field::scalar("count", 0, 4, FieldType::U32)],
        });
        let leaked: &'static SchemaEntryDescriptor = Box::leak(Box::new((*descriptor).clone()));
        let mut ctx = Context::new(Config::new(64));
        ctx.register(leaked).unwrap();
        (ctx, descriptor)
    }

    #[test]
    fn create_writes_header_and_schema_blob_immediately() {
        let (ctx, _d) = sample_ctx();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.btlm");

        let sink = FileSink::create(&path, &ctx).unwrap();
        sink.finalize().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"BTLM");
        let version = u16::from_ne_bytes(bytes[4..6].try_into().unwrap());
        assert_eq!(version, 1);
        let schema_len = u32::from_ne_bytes(bytes[6..10].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), FileHeader::SIZE + schema_len + IndexFooter::SIZE);
    }

    #[test]
    fn drain_into_then_finalize_produces_a_readable_index() {
        let (ctx, _d) = sample_ctx();
        for i in 0..5u32 {
            ctx.log(0, &i.to_ne_bytes()).unwrap();
        }
        let id = ctx.consumer_open(Filter::all()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.btlm");
        let mut sink = FileSink::create(&path, &ctx).unwrap();

        let mut scratch = vec![0u8; 4096];
        let written = sink.drain_into(&ctx, id, &mut scratch).unwrap();
        assert_eq!(written, 1);
        assert_eq!(sink.index.len(), 1);
        assert_eq!(sink.index[0].entry_count, 5);

        sink.finalize().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let footer_bytes = &bytes[bytes.len() - IndexFooter::SIZE..];
        let footer = IndexFooter::decode(footer_bytes);
        assert_eq!(footer.magic, IndexFooter::MAGIC);
        assert_eq!(footer.index_count, 1);

        let entry_bytes =
            &bytes[footer.index_offset as usize..footer.index_offset as usize + IndexEntry::SIZE];
        let entry = IndexEntry::decode(entry_bytes);
        assert_eq!(entry.entry_count, 5);
        assert_eq!(entry.dropped, 0);
    }

    #[test]
    fn capture_stops_after_shutdown_and_flushes_final_drain() {
        let (ctx, _d) = sample_ctx();
        let id = ctx.consumer_open(Filter::all()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.btlm");
        let mut sink = FileSink::create(&path, &ctx).unwrap();

        let shutdown = AtomicBool::new(false);
        thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..10u32 {
                    ctx.log(0, &i.to_ne_bytes()).unwrap();
                }
                shutdown.store(true, Ordering::Relaxed);
            });
            capture(&ctx, id, &mut sink, &shutdown, Duration::from_millis(1)).unwrap();
        });

        sink.finalize().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let footer = IndexFooter::decode(&bytes[bytes.len() - IndexFooter::SIZE..]);
        assert!(footer.index_count >= 1);

        let total_entries: u16 = {
            let mut off = footer.index_offset as usize;
            let mut sum = 0u16;
            for _ in 0..footer.index_count {
                let entry = IndexEntry::decode(&bytes[off..off + IndexEntry::SIZE]);
                sum += entry.entry_count;
                off += IndexEntry::SIZE;
            }
            sum
        };
        assert_eq!(total_entries, 10);
    }
}
