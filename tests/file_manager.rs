use std::fs;

use rudder_typer::{FileManager, GeneratedFile};

fn file(path: &str, content: &str) -> GeneratedFile {
    GeneratedFile {
        path: path.to_string(),
        content: content.to_string(),
    }
}

#[test]
fn writes_files_and_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let manager = FileManager::new(dir.path());
    let written = manager
        .write_files(&[
            file("Main.kt", "package a\n"),
            file("com/example/Extra.kt", "package com.example\n"),
        ])
        .unwrap();

    assert_eq!(written, vec![dir.path().join("Main.kt"), dir.path().join("com/example/Extra.kt")]);
    assert_eq!(fs::read_to_string(dir.path().join("Main.kt")).unwrap(), "package a\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("com/example/Extra.kt")).unwrap(),
        "package com.example\n"
    );
}

#[test]
fn overwrites_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Main.kt"), "stale").unwrap();

    FileManager::new(dir.path())
        .write_files(&[file("Main.kt", "fresh")])
        .unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("Main.kt")).unwrap(), "fresh");
}

#[test]
fn rejected_batch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileManager::new(dir.path())
        .write_files(&[file("Main.kt", "ok"), file("../escape.kt", "nope")])
        .unwrap_err();

    assert!(err.to_string().contains("file 1: path '../escape.kt' must not contain '..'"), "got: {err}");
    assert!(!dir.path().join("Main.kt").exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn leaves_no_temporary_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    FileManager::new(dir.path())
        .write_files(&[file("Main.kt", "x")])
        .unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["Main.kt".to_string()]);
}
