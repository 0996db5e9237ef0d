use httpmock::prelude::*;
use serde_json::json;
use std::{cell::Cell, fs, path::PathBuf, rc::Rc, time::Duration};
use stem_splitter_remote::{
    collect_all_inputs, ApiClient, ClientOptions, PollPolicy, Sleeper, TaskError, VoicePackTrainer,
};
use tempfile::tempdir;

const LICENSE: &str = "train-license";

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientOptions {
        base_url: server.url("/api/v1/"),
        license: LICENSE.into(),
        request_timeout: Duration::from_secs(5),
        download_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[derive(Clone, Default)]
struct CountingSleeper(Rc<Cell<u32>>);

impl Sleeper for CountingSleeper {
    fn sleep(&self, _d: Duration) {
        self.0.set(self.0.get() + 1);
    }
}

fn samples(dir: &std::path::Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|n| {
            let p = dir.join(n);
            fs::write(&p, b"sample audio").unwrap();
            p
        })
        .collect()
}

fn mock_uploads(server: &MockServer, files: &[(&'static str, &'static str)]) {
    for &(name, id) in files {
        let disposition = format!("attachment; filename=\"{name}\"");
        server.mock(move |when, then| {
            when.method(POST)
                .path("/api/v1/upload/")
                .header("content-disposition", disposition);
            then.status(200).json_body(json!({"id": id}));
        });
    }
}

#[test]
fn trains_activates_and_reports_ready_pack() {
    let server = MockServer::start();
    let dir = tempdir().unwrap();
    samples(dir.path(), &["one.wav", "two.wav"]);
    mock_uploads(&server, &[("one.wav", "src-a"), ("two.wav", "src-b")]);

    let start = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/voice_packs/train/start/")
            .header("x-license-key", LICENSE)
            .x_www_form_urlencoded_tuple("id", "src-a,src-b")
            .x_www_form_urlencoded_tuple("pack_name", "My Voice");
        then.status(200).json_body(json!({"status": "success", "train_id": "tr-1"}));
    });
    let check = server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/check/");
        then.status(200).json_body(json!({"voice_packs": {
            "tr-1": {"state": "success", "progress": "100", "pack_name": "My Voice", "pack_id": "PACK_1"}
        }}));
    });
    let activate = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/voice_packs/activate/")
            .x_www_form_urlencoded_tuple("id", "PACK_1");
        then.status(200).json_body(json!({"status": "success"}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/list/");
        then.status(200).json_body(json!({"packs": [
            {"pack_id": "PACK_1", "name": "My Voice", "ready_to_use": true}
        ]}));
    });

    let client = client_for(&server);
    let inputs = collect_all_inputs(&[dir.path().to_path_buf()]).unwrap();
    let outcome = VoicePackTrainer::new(&client)
        .with_sleeper(CountingSleeper::default())
        .train(&inputs, "My Voice")
        .unwrap();

    start.assert_hits(1);
    check.assert_hits(1);
    activate.assert_hits(1);
    assert_eq!(outcome.train_id, "tr-1");
    assert_eq!(outcome.pack_id, "PACK_1");
    assert_eq!(outcome.source_ids, vec!["src-a", "src-b"]);
    assert!(outcome.ready);
}

#[test]
fn failed_activation_still_returns_the_trained_pack() {
    let server = MockServer::start();
    let dir = tempdir().unwrap();
    let inputs = samples(dir.path(), &["solo.wav"]);
    mock_uploads(&server, &[("solo.wav", "src-s")]);

    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/start/");
        then.status(200).json_body(json!({"train_id": "tr-2"}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/check/");
        then.status(200)
            .json_body(json!({"voice_packs": {"tr-2": {"state": "success", "pack_id": "PACK_2"}}}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/activate/");
        then.status(200)
            .json_body(json!({"status": "error", "error": "not enough credits"}));
    });
    let list = server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/list/");
        then.status(200).json_body(json!({"packs": []}));
    });

    let client = client_for(&server);
    let outcome = VoicePackTrainer::new(&client)
        .with_sleeper(CountingSleeper::default())
        .train(&inputs, "Solo")
        .unwrap();

    assert_eq!(outcome.pack_id, "PACK_2");
    assert!(!outcome.ready);
    assert_eq!(list.hits(), 0);
}

#[test]
fn training_gives_up_after_attempt_budget() {
    let server = MockServer::start();
    let dir = tempdir().unwrap();
    let inputs = samples(dir.path(), &["long.wav"]);
    mock_uploads(&server, &[("long.wav", "src-l")]);

    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/start/");
        then.status(200).json_body(json!({"train_id": "tr-3"}));
    });
    let check = server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/check/");
        then.status(200)
            .json_body(json!({"voice_packs": {"tr-3": {"state": "training", "progress": 30}}}));
    });
    let activate = server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/activate/");
        then.status(200).json_body(json!({}));
    });

    let sleeper = CountingSleeper::default();
    let client = client_for(&server);
    let err = VoicePackTrainer::new(&client)
        .with_poll_policy(PollPolicy {
            interval: Duration::from_secs(60),
            max_attempts: 3,
        })
        .with_sleeper(sleeper.clone())
        .train(&inputs, "Long")
        .unwrap_err();

    assert!(matches!(err, TaskError::Timeout { attempts: 3, .. }), "got {err:?}");
    check.assert_hits(3);
    assert_eq!(sleeper.0.get(), 2);
    assert_eq!(activate.hits(), 0);
}

#[test]
fn vanished_training_is_a_remote_error() {
    let server = MockServer::start();
    let dir = tempdir().unwrap();
    let inputs = samples(dir.path(), &["gone.wav"]);
    mock_uploads(&server, &[("gone.wav", "src-g")]);

    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/start/");
        then.status(200).json_body(json!({"train_id": "tr-4"}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/voice_packs/train/check/");
        then.status(200).json_body(json!({"voice_packs": {}}));
    });

    let client = client_for(&server);
    let err = VoicePackTrainer::new(&client)
        .with_sleeper(CountingSleeper::default())
        .train(&inputs, "Gone")
        .unwrap_err();
    assert!(matches!(err, TaskError::RemoteProcessing(_)), "got {err:?}");
}

#[test]
fn empty_pack_name_is_rejected_before_uploading() {
    let server = MockServer::start();
    let dir = tempdir().unwrap();
    let inputs = samples(dir.path(), &["a.wav"]);
    let upload = server.mock(|when, then| {
        when.method(POST).path("/api/v1/upload/");
        then.status(200).json_body(json!({"id": "never"}));
    });

    let client = client_for(&server);
    let err = VoicePackTrainer::new(&client).train(&inputs, "  ").unwrap_err();
    assert!(matches!(err, TaskError::Validation(_)));
    assert_eq!(upload.hits(), 0);
}
