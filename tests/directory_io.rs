use cdcfs::{CdcFsError, ErrorKind, Reader, Writer, WriterOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn options() -> WriterOptions {
    WriterOptions::default().with_compression_level(3).with_chunk_sizes(1024, 4096, 16384)
}

fn populate(root: &Path) {
    fs::create_dir_all(root.join("css")).unwrap();
    fs::create_dir_all(root.join("posts/2024")).unwrap();
    fs::write(root.join("index.html"), b"<html>home</html>").unwrap();
    fs::write(root.join("css/site.css"), b"body { margin: 0; }").unwrap();
    fs::write(root.join("posts/2024/first.md"), "# First\n".repeat(500)).unwrap();
    fs::write(root.join("posts/2024/empty.md"), b"").unwrap();
}

fn names<R: std::io::Read + std::io::Seek>(reader: &Reader<R>, path: &str) -> Vec<String> {
    reader.list(path).unwrap().iter().map(|e| e.full_name().to_string()).collect()
}

#[test]
fn add_directory_recursive() {
    let src = tempdir().unwrap();
    populate(src.path());
    let out = tempdir().unwrap();
    let archive = out.path().join("site.cdcfs");

    let mut writer = Writer::new(options()).unwrap();
    writer.add_directory(src.path(), true, None).unwrap();
    assert_eq!(writer.file_count(), 4);
    let summary = writer.build_to_path(&archive).unwrap();
    assert_eq!(summary.total_length, fs::metadata(&archive).unwrap().len());

    let reader = Reader::open_path(&archive).unwrap();
    assert_eq!(names(&reader, ""), vec!["css", "posts", "index.html"]);
    assert_eq!(reader.read_file("posts/2024/first.md").unwrap(), "# First\n".repeat(500).into_bytes());
    assert!(reader.read_file("posts/2024/empty.md").unwrap().is_empty());
}

#[test]
fn add_directory_top_level_only() {
    let src = tempdir().unwrap();
    populate(src.path());

    let mut writer = Writer::new(options()).unwrap();
    writer.add_directory(src.path(), false, None).unwrap();
    assert_eq!(writer.file_count(), 1);

    let mut out = Vec::new();
    writer.build(&mut out).unwrap();
    let reader = Reader::new(std::io::Cursor::new(out)).unwrap();
    assert_eq!(names(&reader, ""), vec!["index.html"]);
}

#[test]
fn add_directory_under_target_root() {
    let src = tempdir().unwrap();
    populate(src.path());

    let mut writer = Writer::new(options()).unwrap();
    writer.add_directory(src.path(), true, Some("www/")).unwrap();
    let mut out = Vec::new();
    writer.build(&mut out).unwrap();

    let reader = Reader::new(std::io::Cursor::new(out)).unwrap();
    assert_eq!(names(&reader, ""), vec!["www"]);
    assert_eq!(reader.read_file("www/css/site.css").unwrap(), b"body { margin: 0; }");
    assert!(reader.get("www/posts/2024").unwrap().is_directory());
}

#[test]
fn dot_target_root_means_archive_root() {
    let src = tempdir().unwrap();
    populate(src.path());

    let mut writer = Writer::new(options()).unwrap();
    writer.add_directory(src.path(), true, Some(".")).unwrap();
    let mut out = Vec::new();
    writer.build(&mut out).unwrap();

    let reader = Reader::new(std::io::Cursor::new(out)).unwrap();
    assert!(reader.get("index.html").unwrap().is_file());
}

#[test]
fn missing_source_directory() {
    let src = tempdir().unwrap();
    let mut writer = Writer::new(options()).unwrap();
    let err = writer.add_directory(src.path().join("nope"), true, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn add_file_from_path_and_missing_file() {
    let src = tempdir().unwrap();
    let file = src.path().join("data.bin");
    fs::write(&file, vec![7u8; 5000]).unwrap();

    let mut writer = Writer::new(options()).unwrap();
    writer.add_file_from_path(&file, "blobs/data.bin").unwrap();
    let err = writer.add_file_from_path(src.path().join("missing.bin"), "blobs/missing.bin").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let mut out = Vec::new();
    writer.build(&mut out).unwrap();
    let reader = Reader::new(std::io::Cursor::new(out)).unwrap();
    assert_eq!(reader.read_file("blobs/data.bin").unwrap(), vec![7u8; 5000]);
    assert_eq!(reader.get("blobs/missing.bin").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn extract_tree_and_single_file() {
    let src = tempdir().unwrap();
    populate(src.path());
    let work = tempdir().unwrap();
    let archive = work.path().join("site.cdcfs");

    let mut writer = Writer::new(options()).unwrap();
    writer.add_directory(src.path(), true, None).unwrap();
    writer.build_to_path(&archive).unwrap();
    let reader = Reader::open_path(&archive).unwrap();

    let all = work.path().join("all");
    assert_eq!(reader.extract_to("", &all, true).unwrap(), 4);
    for rel in ["index.html", "css/site.css", "posts/2024/first.md", "posts/2024/empty.md"] {
        assert_eq!(fs::read(all.join(rel)).unwrap(), fs::read(src.path().join(rel)).unwrap(), "{}", rel);
    }

    let top = work.path().join("top");
    assert_eq!(reader.extract_to("/", &top, false).unwrap(), 1);
    assert!(top.join("index.html").is_file());
    assert!(!top.join("css").exists());

    let posts = work.path().join("posts");
    assert_eq!(reader.extract_to("posts", &posts, true).unwrap(), 2);
    assert!(posts.join("2024/first.md").is_file());

    let single = work.path().join("single");
    assert_eq!(reader.extract_to("css/site.css", &single, false).unwrap(), 1);
    assert_eq!(fs::read(single.join("site.css")).unwrap(), b"body { margin: 0; }");

    assert_eq!(reader.extract_to("nothing", &single, true).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn open_path_on_missing_file() {
    let dir = tempdir().unwrap();
    let err = Reader::open_path(dir.path().join("absent.cdcfs")).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn parent_segments_are_rejected_when_adding() {
    let mut writer = Writer::new(options()).unwrap();
    for target in ["a/../../escaped.txt", "../escaped.txt", "a\\..\\..\\escaped.txt", "a/b\0c"] {
        let err = writer.add_file(b"outside", target).unwrap_err();
        assert!(matches!(err, CdcFsError::InvalidPath(_)), "{:?}", target);
        assert_eq!(err.kind(), ErrorKind::Construction);
    }
    assert_eq!(writer.file_count(), 0);
    writer.add_file(b"fine", "a/..b/c..").unwrap();
}

#[test]
fn crafted_parent_directory_name_is_refused() {
    let mut writer = Writer::new(options().with_no_zstd(true).with_no_hash(true)).unwrap();
    writer.add_file(b"outside", "zz/escaped.txt").unwrap();
    let mut archive = Vec::new();
    writer.build(&mut archive).unwrap();

    // Rename directory "zz" to ".." in the uncompressed, unhashed tables.
    let at = archive.windows(3).position(|w| w == b"\x02zz").unwrap();
    archive[at + 1..at + 3].copy_from_slice(b"..");

    let err = Reader::new(std::io::Cursor::new(archive)).err().unwrap();
    assert!(matches!(err, CdcFsError::InvalidFormat(_)));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn extraction_stays_inside_destination() {
    let root = tempdir().unwrap();
    let dest = root.path().join("inner/dest");

    let mut writer = Writer::new(options()).unwrap();
    writer.add_file(b"kept", "a/kept.txt").unwrap();
    assert!(writer.add_file(b"outside", "a/../../escaped.txt").is_err());
    let mut out = Vec::new();
    writer.build(&mut out).unwrap();

    let reader = Reader::new(std::io::Cursor::new(out)).unwrap();
    assert_eq!(reader.extract_to("", &dest, true).unwrap(), 1);
    assert_eq!(fs::read(dest.join("a/kept.txt")).unwrap(), b"kept");
    assert!(!root.path().join("inner/escaped.txt").exists());
    assert!(!root.path().join("escaped.txt").exists());
}
