use sectorfs::{DirEntryInfo, Fs, FsError};

fn empty_buf(n: usize) -> Vec<DirEntryInfo> {
    vec![
        DirEntryInfo {
            name: String::new(),
            inode: 0,
            is_directory: false,
        };
        n
    ]
}

#[test]
fn fresh_boot_creates_image_and_reports_empty_root() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");
    assert!(!img.exists());

    let _fs = Fs::boot(&img).unwrap();
    assert!(img.exists());
    assert_eq!(
        img.metadata().unwrap().len(),
        sectorfs::SECTOR_SIZE as u64 * sectorfs::TOTAL_SECTORS as u64
    );

    let fs2 = Fs::boot(&img).unwrap();
    assert_eq!(fs2.dir_size("/").unwrap(), 0);
}

#[test]
fn create_then_list_yields_entries_in_allocation_order() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");

    let mut fs = Fs::boot(&img).unwrap();
    fs.file_create("/a.txt").unwrap();
    fs.file_create("/b.txt").unwrap();

    assert_eq!(fs.dir_size("/").unwrap(), 2);

    let mut buf = empty_buf(2);
    let n = fs.dir_read("/", &mut buf).unwrap();
    assert_eq!(n, 2);
    assert_eq!(buf[0].name, "a.txt");
    assert_eq!(buf[0].inode, 1);
    assert_eq!(buf[1].name, "b.txt");
    assert_eq!(buf[1].inode, 2);
}

#[test]
fn write_and_read_back_then_eof() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");

    let mut fs = Fs::boot(&img).unwrap();
    fs.file_create("/a.txt").unwrap();
    let fd = fs.file_open("/a.txt").unwrap();
    assert_eq!(fs.file_write(fd, b"hello world").unwrap(), 11);
    fs.file_close(fd).unwrap();

    let fd2 = fs.file_open("/a.txt").unwrap();
    let mut buf = [0u8; 11];
    assert_eq!(fs.file_read(fd2, &mut buf).unwrap(), 11);
    assert_eq!(&buf, b"hello world");
    assert_eq!(fs.file_read(fd2, &mut buf).unwrap(), 0);
}

#[test]
fn swap_with_last_removal_keeps_remaining_pair_reachable_and_x_gone() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");

    let mut fs = Fs::boot(&img).unwrap();
    fs.file_create("/x").unwrap();
    fs.file_create("/y").unwrap();
    fs.file_create("/z").unwrap();

    fs.file_unlink("/x").unwrap();
    assert_eq!(fs.dir_size("/").unwrap(), 2);
    assert!(matches!(fs.file_open("/x"), Err(FsError::NoSuchFile)));

    let mut buf = empty_buf(2);
    fs.dir_read("/", &mut buf).unwrap();
    let names: Vec<&str> = buf.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"y"));
    assert!(names.contains(&"z"));
    assert!(!names.contains(&"x"));
}

#[test]
fn disk_full_write_then_earlier_file_still_reads_in_full() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");

    let mut fs = Fs::boot(&img).unwrap();
    fs.file_create("/first").unwrap();
    let fd_first = fs.file_open("/first").unwrap();
    fs.file_write(fd_first, b"still here").unwrap();

    let mut hog_count: u32 = 0;
    loop {
        let name = format!("/hog{hog_count}");
        if fs.file_create(&name).is_err() {
            break;
        }
        let fd = fs.file_open(&name).unwrap();
        loop {
            match fs.file_write(fd, &[0xAAu8; 512]) {
                Ok(_) => continue,
                Err(FsError::FileTooBig) => break,
                Err(FsError::NoSpace) => break,
                Err(e) => panic!("unexpected error while filling disk: {e}"),
            }
        }
        hog_count += 1;
        if hog_count > sectorfs::MAX_FILES {
            panic!("disk never reported NoSpace");
        }
    }

    let mut buf = [0u8; 16];
    let n = fs.file_read(fd_first, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"still here");
}

#[test]
fn name_length_and_character_limits() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");
    let mut fs = Fs::boot(&img).unwrap();

    fs.file_create("/abcdefghijklmno").unwrap(); // 15 chars, ok
    assert!(matches!(
        fs.file_create("/abcdefghijklmnop"), // 16 chars
        Err(FsError::Create)
    ));
    assert!(matches!(fs.file_create("/bad name"), Err(FsError::Create)));
}

#[test]
fn sync_then_reboot_preserves_observable_state() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img");

    let mut fs = Fs::boot(&img).unwrap();
    fs.file_create("/a.txt").unwrap();
    let fd = fs.file_open("/a.txt").unwrap();
    fs.file_write(fd, b"persisted").unwrap();
    fs.dir_create("/sub").unwrap();
    fs.sync().unwrap();

    let mut fs2 = Fs::boot(&img).unwrap();
    assert_eq!(fs2.dir_size("/").unwrap(), 2);
    let fd2 = fs2.file_open("/a.txt").unwrap();
    let mut buf = [0u8; 16];
    let n = fs2.file_read(fd2, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"persisted");
}
