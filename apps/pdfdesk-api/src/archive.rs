//! ZIP packaging for multi-file results

use std::io::{Cursor, Write};

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Build an in-memory deflated archive from `(name, bytes)` entries
pub fn zip_entries<'a, I>(entries: I) -> anyhow::Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(name, options)?;
        zip.write_all(content)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_entries_keep_names_and_content() {
        let bytes = zip_entries([
            ("part1.pdf", b"first".as_slice()),
            ("part2.pdf", b"".as_slice()),
        ])
        .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut first = String::new();
        archive
            .by_name("part1.pdf")
            .unwrap()
            .read_to_string(&mut first)
            .unwrap();
        assert_eq!(first, "first");
        assert_eq!(archive.by_name("part2.pdf").unwrap().size(), 0);
    }
}
