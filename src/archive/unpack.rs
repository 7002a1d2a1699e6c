//! Sequential zip extraction into a folder.

use std::io::{self, BufRead, BufReader, Read};
use std::ops::ControlFlow;

use flate2::CrcReader;
use flate2::bufread::DeflateDecoder;
use tracing::{debug, trace};
use zip::read::read_zipfile_from_stream;
use zip::result::ZipError;

use crate::{File, Folder, JailedPath, ResourceError};

const LOCAL_FILE_HEADER: [u8; 4] = *b"PK\x03\x04";
const DATA_DESCRIPTOR: [u8; 4] = *b"PK\x07\x08";
const END_OF_CENTRAL_DIRECTORY: [u8; 4] = *b"PK\x05\x06";
const ZIP64_END_OF_CENTRAL_DIRECTORY: [u8; 4] = *b"PK\x06\x06";

/// General purpose flag: sizes and CRC follow the entry data.
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
const METHOD_DEFLATED: u16 = 8;
const ZIP64_EXTRA_FIELD: u16 = 0x0001;

/// Extract every entry of the zip data in `input` into `destination`.
///
/// The destination is created if missing. Entries are processed strictly in
/// stream order: directory entries create folders, file entries stream their
/// bytes into the file at the entry's name. Entry names are resolved inside
/// `destination`, so `../` components cannot escape it.
///
/// Deflated entries written by streaming encoders, whose sizes and CRC only
/// follow the data, are inflated until the compressed stream ends and then
/// checked against their data descriptor.
///
/// `input` is only borrowed; pass `&mut reader` to keep using it afterwards.
///
/// # Errors
///
/// - [`ResourceError::Archive`] if the data is not a readable zip stream
/// - any error from creating or writing the destination resources
pub fn unpack<R: Read>(input: R, destination: &Folder) -> Result<(), ResourceError> {
    destination.create_if_missing()?;
    debug!(destination = %destination.path(), "unpacking archive");
    let mut count = 0usize;
    for_each_entry(input, "unpack", |header, data| {
        // Parsing clamps `..`, so the entry lands inside the destination.
        let relative = JailedPath::parse(header.name);
        if relative.is_root() {
            return Ok(ControlFlow::Continue(()));
        }
        let relative = relative.to_relative_string();
        trace!(name = header.name, "extracting entry");
        if header.is_dir {
            destination.get_folder(&relative).create_if_missing()?;
        } else {
            destination.get_file(&relative).content().write_from(data)?;
        }
        count += 1;
        Ok(ControlFlow::Continue(()))
    })?;
    debug!(destination = %destination.path(), entries = count, "archive unpacked");
    Ok(())
}

/// Extract the zip file `file` into `destination`. See [`unpack`].
pub fn unpack_file(file: &File, destination: &Folder) -> Result<(), ResourceError> {
    let input = file.content().open_read()?;
    unpack(input, destination)
}

/// Local header fields of one archive entry.
pub(super) struct EntryHeader<'a> {
    pub(super) name: &'a str,
    pub(super) is_dir: bool,
    /// Uncompressed size, or `None` when it is only recorded after the data.
    pub(super) size: Option<u64>,
}

/// Read `input` as a sequential zip stream, handing each entry to `visit`
/// until it breaks or the entries run out.
pub(super) fn for_each_entry<R, F>(
    input: R,
    operation: &'static str,
    mut visit: F,
) -> Result<(), ResourceError>
where
    R: Read,
    F: FnMut(&EntryHeader<'_>, &mut dyn Read) -> Result<ControlFlow<()>, ResourceError>,
{
    let mut reader = BufReader::new(input);
    loop {
        let mut signature = [0u8; 4];
        reader
            .read_exact(&mut signature)
            .map_err(|e| ResourceError::io(operation, &JailedPath::root(), e))?;
        // An archive without entries starts directly with its end record.
        if signature == END_OF_CENTRAL_DIRECTORY || signature == ZIP64_END_OF_CENTRAL_DIRECTORY {
            return Ok(());
        }
        let mut fields = [0u8; 26];
        if signature == LOCAL_FILE_HEADER {
            reader
                .read_exact(&mut fields)
                .map_err(|e| ResourceError::io(operation, &JailedPath::root(), e))?;
            if le_u16(&fields, 2) & FLAG_DATA_DESCRIPTOR != 0 {
                if visit_described(&mut reader, &fields, operation, &mut visit)?.is_break() {
                    return Ok(());
                }
                continue;
            }
        }
        let consumed: &[u8] = if signature == LOCAL_FILE_HEADER { &fields } else { &[] };
        let mut stream = (&signature[..]).chain(consumed).chain(&mut reader);
        let Some(mut entry) =
            read_zipfile_from_stream(&mut stream).map_err(|e| ResourceError::archive(operation, e))?
        else {
            return Ok(());
        };
        let name = entry.name().to_owned();
        let header = EntryHeader {
            name: &name,
            is_dir: entry.is_dir(),
            size: Some(entry.size()),
        };
        if visit(&header, &mut entry)?.is_break() {
            return Ok(());
        }
    }
}

/// Visit an entry whose sizes follow its data, given the local header fields
/// after the signature. Leaves `reader` after the data descriptor.
fn visit_described<R, F>(
    reader: &mut R,
    fields: &[u8; 26],
    operation: &'static str,
    visit: &mut F,
) -> Result<ControlFlow<()>, ResourceError>
where
    R: BufRead,
    F: FnMut(&EntryHeader<'_>, &mut dyn Read) -> Result<ControlFlow<()>, ResourceError>,
{
    let io_error = |e| ResourceError::io(operation, &JailedPath::root(), e);
    let mut name = vec![0u8; usize::from(le_u16(fields, 22))];
    reader.read_exact(&mut name).map_err(io_error)?;
    let mut extra = vec![0u8; usize::from(le_u16(fields, 24))];
    reader.read_exact(&mut extra).map_err(io_error)?;
    let name = String::from_utf8_lossy(&name).into_owned();

    // Without a compressed length only a self-terminating stream can be read.
    if le_u16(fields, 4) != METHOD_DEFLATED {
        return Err(ResourceError::archive(
            operation,
            ZipError::UnsupportedArchive("data descriptor on an entry that is not deflated"),
        ));
    }

    let mut data = CrcReader::new(DeflateDecoder::new(&mut *reader));
    let header = EntryHeader {
        name: &name,
        is_dir: name.ends_with('/'),
        size: None,
    };
    if visit(&header, &mut data)?.is_break() {
        return Ok(ControlFlow::Break(()));
    }
    io::copy(&mut data, &mut io::sink()).map_err(io_error)?;
    let crc = data.crc().sum();
    let compressed = data.get_ref().total_in();
    let uncompressed = data.get_ref().total_out();
    drop(data);

    let descriptor = read_descriptor(reader, has_zip64_extra(&extra)).map_err(io_error)?;
    if descriptor != (crc, compressed, uncompressed) {
        return Err(ResourceError::archive(
            operation,
            ZipError::InvalidArchive("data descriptor does not match entry data".into()),
        ));
    }
    Ok(ControlFlow::Continue(()))
}

/// Read a data descriptor as `(crc, compressed size, uncompressed size)`.
/// The leading signature is optional.
fn read_descriptor<R: Read>(reader: &mut R, zip64: bool) -> io::Result<(u32, u64, u64)> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    if word == DATA_DESCRIPTOR {
        reader.read_exact(&mut word)?;
    }
    let crc = u32::from_le_bytes(word);
    let (compressed, uncompressed) = if zip64 {
        let mut sizes = [0u8; 16];
        reader.read_exact(&mut sizes)?;
        (le_u64(&sizes, 0), le_u64(&sizes, 8))
    } else {
        let mut sizes = [0u8; 8];
        reader.read_exact(&mut sizes)?;
        (u64::from(le_u32(&sizes, 0)), u64::from(le_u32(&sizes, 4)))
    };
    Ok((crc, compressed, uncompressed))
}

/// Zip64 entries record 8-byte sizes in their data descriptor.
fn has_zip64_extra(mut extra: &[u8]) -> bool {
    while extra.len() >= 4 {
        if le_u16(extra, 0) == ZIP64_EXTRA_FIELD {
            return true;
        }
        let len = usize::from(le_u16(extra, 2));
        extra = extra.get(4 + len..).unwrap_or_default();
    }
    false
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from(le_u32(bytes, at)) | (u64::from(le_u32(bytes, at + 4)) << 32)
}

#[cfg(test)]
pub(super) mod tests {
    use std::io::{Cursor, Write};

    use flate2::Crc;
    use flate2::write::DeflateEncoder;

    use super::*;
    use crate::VirtualFolder;

    /// An archive laid out the way streaming encoders write it: deflated
    /// entries with zeroed sizes in the local header and a data descriptor
    /// after the data.
    pub(in crate::archive) fn streamed_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, data) in entries {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            let compressed = encoder.finish().unwrap();
            let mut crc = Crc::new();
            crc.update(data);

            out.extend_from_slice(&LOCAL_FILE_HEADER);
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&FLAG_DATA_DESCRIPTOR.to_le_bytes());
            out.extend_from_slice(&METHOD_DEFLATED.to_le_bytes());
            out.extend_from_slice(&[0; 16]);
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&compressed);
            out.extend_from_slice(&DATA_DESCRIPTOR);
            out.extend_from_slice(&crc.sum().to_le_bytes());
            out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY);
        out.extend_from_slice(&[0; 18]);
        out
    }

    fn archive(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            match data {
                Some(data) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(data).unwrap();
                }
                None => writer.add_directory(*name, options).unwrap(),
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn entries_cannot_escape_destination() {
        let root = VirtualFolder::new().root();
        let destination = root.get_folder("out");
        let data = archive(&[("../../evil.txt", Some(&b"evil"[..])), ("ok.txt", Some(&b"ok"[..]))]);
        unpack(&data[..], &destination).unwrap();
        assert!(!root.get_file("evil.txt").exists().unwrap());
        assert_eq!(
            destination.get_file("evil.txt").content().read_to_string().unwrap(),
            "evil"
        );
        assert_eq!(
            destination.get_file("ok.txt").content().read_to_string().unwrap(),
            "ok"
        );
    }

    #[test]
    fn directory_entries_create_empty_folders() {
        let root = VirtualFolder::new().root();
        let data = archive(&[("empty/", None), ("nested/deep/", None)]);
        unpack(&data[..], &root).unwrap();
        assert!(root.get_folder("empty").exists().unwrap());
        assert!(root.get_folder("nested/deep").exists().unwrap());
        assert!(root.get_folder("empty").list().unwrap().is_empty());
    }

    #[test]
    fn creates_missing_destination() {
        let root = VirtualFolder::new().root();
        let destination = root.get_folder("a/b");
        unpack(&archive(&[])[..], &destination).unwrap();
        assert!(destination.exists().unwrap());
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let root = VirtualFolder::new().root();
        let err = unpack(&b"definitely not a zip file"[..], &root).unwrap_err();
        assert!(matches!(err, ResourceError::Archive { operation: "unpack", .. }));
    }

    #[test]
    fn unpack_file_reads_archive_from_a_resource() {
        let root = VirtualFolder::new().root();
        let bundle = root.get_file("bundle.zip");
        bundle
            .content()
            .write_bytes(&archive(&[("x/y.txt", Some(&b"y"[..]))]))
            .unwrap();
        let destination = root.get_folder("out");
        unpack_file(&bundle, &destination).unwrap();
        assert_eq!(
            destination.get_file("x/y.txt").content().read_to_string().unwrap(),
            "y"
        );
    }

    #[test]
    fn reads_entries_with_data_descriptors() {
        let root = VirtualFolder::new().root();
        let body = "streamed ".repeat(200);
        let data = streamed_archive(&[
            ("docs/", &b""[..]),
            ("docs/a.txt", body.as_bytes()),
            ("b.txt", &b"short"[..]),
        ]);
        unpack(&data[..], &root).unwrap();
        assert!(root.get_folder("docs").exists().unwrap());
        assert_eq!(root.get_file("docs/a.txt").content().read_to_string().unwrap(), body);
        assert_eq!(root.get_file("b.txt").content().read_to_string().unwrap(), "short");
    }

    #[test]
    fn mismatched_data_descriptor_is_an_archive_error() {
        let root = VirtualFolder::new().root();
        let mut data = streamed_archive(&[("a.txt", &b"payload"[..])]);
        // Corrupt the CRC that follows the descriptor signature.
        let crc_at = data.len() - 22 - 12;
        data[crc_at] ^= 0xff;
        let err = unpack(&data[..], &root).unwrap_err();
        assert!(matches!(err, ResourceError::Archive { operation: "unpack", .. }));
    }

    #[test]
    fn descriptor_without_signature_is_accepted() {
        let root = VirtualFolder::new().root();
        let data = streamed_archive(&[("a.txt", &b"payload"[..])]);
        let descriptor_at = data.len() - 22 - 16;
        let mut unsigned = data[..descriptor_at].to_vec();
        unsigned.extend_from_slice(&data[descriptor_at + 4..]);
        unpack(&unsigned[..], &root).unwrap();
        assert_eq!(root.get_file("a.txt").content().read_to_string().unwrap(), "payload");
    }

    #[test]
    fn mixed_streamed_and_sized_entries() {
        let root = VirtualFolder::new().root();
        let mut data = streamed_archive(&[("first.txt", &b"one"[..])]);
        // Drop the end record and append a regular archive after the entry.
        data.truncate(data.len() - 22);
        data.extend_from_slice(&archive(&[("second.txt", Some(&b"two"[..]))]));
        unpack(&data[..], &root).unwrap();
        assert_eq!(root.get_file("first.txt").content().read_to_string().unwrap(), "one");
        assert_eq!(root.get_file("second.txt").content().read_to_string().unwrap(), "two");
    }
}
