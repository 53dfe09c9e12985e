mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{channel, eventually, expect, QUIET, WAIT};
use parking_lot::Mutex;
use tdshell_client::types::enums::{MessageContent, MessageSender, Update};
use tdshell_client::types::types::{Document, File, FileId, LocalFile, Message, Photo, PhotoSize};
use tdshell_client::types::{Function, Object};
use tdshell_client::{Config, DownloadProgress, InvocationError};

fn file(id: FileId, downloaded: i64, completed: bool) -> File {
    File {
        id,
        size: 1_000,
        expected_size: 1_000,
        local: LocalFile {
            path: if completed { format!("/data/{id}") } else { String::new() },
            can_be_downloaded: true,
            is_downloading_active: !completed && downloaded > 0,
            is_downloading_completed: completed,
            downloaded_size: downloaded,
        },
    }
}

fn document(id: i64, f: File, name: &str) -> Message {
    Message {
        id,
        chat_id: 1,
        sender:  MessageSender::User(1),
        date:    id as i32,
        content: MessageContent::Document {
            document: Document { file_name: name.into(), mime_type: "application/pdf".into(), document: f },
            caption:  "".into(),
        },
    }
}

#[test]
fn completed_file_resolves_without_a_request() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let pending = ch.download_file(&file(3, 1_000, true), move |p| s.lock().push(p.clone())).unwrap();
    assert!(pending.is_ready());
    let done = pending.wait().unwrap();
    assert!(done.completed);
    assert_eq!(done.path, "/data/3");
    assert_eq!(seen.lock().len(), 1);
    assert!(backend.next_request(QUIET).is_none());
}

#[test]
fn progress_pushes_drive_the_download() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let seen: Arc<Mutex<Vec<DownloadProgress>>> = Arc::default();
    thread::scope(|s| {
        let ch = &ch;
        let sink = seen.clone();
        let downloader = s.spawn(move || {
            ch.download_file(&file(7, 0, false), move |p| sink.lock().push(p.clone()))
                .and_then(|d| d.wait_timeout(WAIT))
        });

        match expect(&backend, "downloadFile") {
            (id, Function::DownloadFile(req)) => {
                assert_eq!((req.file_id, req.priority, req.offset, req.limit), (7, 32, 0, 0));
                assert!(!req.synchronous);
                backend.reply(id, Object::File(file(7, 0, false)));
            }
            (_, f) => panic!("unexpected {f:?}"),
        }
        backend.push(Update::File(file(7, 400, false)));
        backend.push(Update::File(file(7, 800, false)));
        backend.push(Update::File(file(7, 1_000, true)));

        let done = downloader.join().unwrap().unwrap();
        assert!(done.completed);
        assert_eq!(done.file_id, 7);
    });

    let sizes: Vec<i64> = seen.lock().iter().map(|p| p.downloaded).collect();
    assert_eq!(sizes, [400, 800, 1_000]);
}

#[test]
fn batch_download_waits_for_every_file() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let photo = Message {
        id:      3,
        chat_id: 1,
        sender:  MessageSender::User(2),
        date:    3,
        content: MessageContent::Photo {
            photo: Photo {
                sizes: vec![
                    PhotoSize { kind: "s".into(), width: 90, height: 90, photo: { let mut f = file(30, 0, false); f.expected_size = 10; f } },
                    PhotoSize { kind: "x".into(), width: 800, height: 800, photo: file(31, 0, false) },
                ],
            },
            caption: "sunset".into(),
        },
    };
    let messages = vec![
        document(1, file(10, 0, false), "report.pdf"),
        document(2, file(11, 1_000, true), "done.pdf"),
        photo,
        common::text(1, 4, 4),
    ];

    let labels = Arc::new(Mutex::new(Vec::new()));
    thread::scope(|s| {
        let ch = &ch;
        let sink = labels.clone();
        let batch = s.spawn(move || {
            ch.download_messages(&messages, move |name, p| {
                if p.completed {
                    sink.lock().push(name.to_string());
                }
            })
        });

        // Only the two incomplete files are requested; the photo uses its largest size.
        let mut requested = Vec::new();
        for _ in 0..2 {
            match expect(&backend, "downloadFile") {
                (id, Function::DownloadFile(req)) => {
                    requested.push(req.file_id);
                    backend.reply(id, Object::File(file(req.file_id, 0, false)));
                }
                (_, f) => panic!("unexpected {f:?}"),
            }
        }
        requested.sort();
        assert_eq!(requested, [10, 31]);

        backend.push(Update::File(file(31, 1_000, true)));
        backend.push(Update::File(file(10, 1_000, true)));

        let results = batch.join().unwrap().unwrap();
        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["report.pdf", "done.pdf", "sunset"]);
        assert!(results.iter().all(|(_, p)| p.completed));
    });

    let mut labels = labels.lock().clone();
    labels.sort();
    assert_eq!(labels, ["done.pdf", "report.pdf", "sunset"]);
}

#[test]
fn undownloadable_file_fails_the_batch_up_front() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let mut locked = file(12, 0, false);
    locked.local.can_be_downloaded = false;
    let messages = vec![document(1, file(10, 0, false), "ok.pdf"), document(2, locked, "secret.pdf")];

    let err = ch.download_messages(&messages, |_, _| {}).unwrap_err();
    assert!(matches!(err, InvocationError::NotDownloadable(ref name) if name == "secret.pdf"));
    assert!(backend.next_request(QUIET).is_none(), "nothing was started");
}

#[test]
fn stop_releases_download_waiters() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    thread::scope(|s| {
        let ch = &ch;
        let downloader = s.spawn(move || ch.download_file(&file(8, 0, false), |_| {}));
        let (id, _) = expect(&backend, "downloadFile");
        backend.reply(id, Object::File(file(8, 0, false)));
        let pending = downloader.join().unwrap().unwrap();

        ch.stop();
        assert!(matches!(pending.wait(), Err(InvocationError::Dropped)));
    });
}

#[test]
fn registering_again_replaces_the_callback() {
    let (ch, backend) = channel(Config::default());

    let first = Arc::new(Mutex::new(0));
    let second = Arc::new(Mutex::new(0));
    let (a, b) = (first.clone(), second.clone());
    assert!(!ch.register_progress(5, move |_| *a.lock() += 1));
    assert!(ch.register_progress(5, move |_| *b.lock() += 1));

    backend.push(Update::File(file(5, 10, false)));
    assert!(ch.pump(WAIT));
    assert_eq!((*first.lock(), *second.lock()), (0, 1));

    assert!(ch.unregister_progress(5));
    backend.push(Update::File(file(5, 20, false)));
    assert!(ch.pump(WAIT));
    assert_eq!(*second.lock(), 1);
}

#[test]
fn timed_out_download_stops_reporting() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let calls = Arc::new(Mutex::new(0));
    thread::scope(|s| {
        let ch = &ch;
        let c = calls.clone();
        let downloader = s.spawn(move || {
            ch.download_file(&file(9, 0, false), move |_| *c.lock() += 1)
                .and_then(|d| d.wait_timeout(Duration::from_millis(20)))
        });
        let (id, _) = expect(&backend, "downloadFile");
        backend.reply(id, Object::File(file(9, 0, false)));
        assert!(matches!(downloader.join().unwrap(), Err(InvocationError::Timeout(_))));
    });

    backend.push(Update::File(file(9, 500, false)));
    thread::sleep(QUIET);
    assert_eq!(*calls.lock(), 0, "no progress after giving up");
    assert!(!ch.unregister_progress(9));
}

#[test]
fn failed_download_request_keeps_a_newer_registration() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let newer = Arc::new(Mutex::new(0));
    thread::scope(|s| {
        let ch = &ch;
        let downloader = s.spawn(move || ch.download_file(&file(4, 0, false), |_| {}));
        let (id, _) = expect(&backend, "downloadFile");

        let n = newer.clone();
        assert!(ch.register_progress(4, move |_| *n.lock() += 1));
        backend.reply_error(id, 400, "FILE_ID_INVALID");
        assert!(downloader.join().unwrap().is_err());
    });

    backend.push(Update::File(file(4, 100, false)));
    assert!(eventually(|| *newer.lock() == 1));
}

#[test]
fn complete_answer_reports_on_the_calling_thread() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let threads = Arc::new(Mutex::new(Vec::new()));
    thread::scope(|s| {
        let ch = &ch;
        let t = threads.clone();
        let downloader = s.spawn(move || {
            let pending = ch.download_file(&file(6, 0, false), move |_| t.lock().push(thread::current().id()))?;
            Ok::<_, InvocationError>((thread::current().id(), pending.wait()?))
        });
        let (id, _) = expect(&backend, "downloadFile");
        backend.reply(id, Object::File(file(6, 1_000, true)));

        let (caller, done) = downloader.join().unwrap().unwrap();
        assert!(done.completed);
        assert_eq!(*threads.lock(), [caller]);
    });
}

#[test]
fn cancelled_download_is_cancelled_at_the_backend() {
    let (ch, backend) = channel(Config::default());
    ch.start().unwrap();

    let calls = Arc::new(Mutex::new(0));
    thread::scope(|s| {
        let ch = &ch;
        let c = calls.clone();
        let downloader = s.spawn(move || ch.download_file(&file(5, 0, false), move |_| *c.lock() += 1));
        let (id, _) = expect(&backend, "downloadFile");
        backend.reply(id, Object::File(file(5, 0, false)));
        let pending = downloader.join().unwrap().unwrap();

        let canceller = s.spawn(move || ch.cancel_download(pending));
        match expect(&backend, "cancelDownloadFile") {
            (id, Function::CancelDownloadFile(req)) => {
                assert_eq!(req.file_id, 5);
                backend.reply(id, Object::Ok(tdshell_client::types::types::Ok));
            }
            (_, f) => panic!("unexpected {f:?}"),
        }
        canceller.join().unwrap().unwrap();
    });

    backend.push(Update::File(file(5, 100, false)));
    thread::sleep(QUIET);
    assert_eq!(*calls.lock(), 0);
}
