use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use octofhir_ingest::FileServer;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn file_server_endpoints_work() {
    let root = tempfile::tempdir().expect("tmp dir");
    let data_dir = root.path().join("data");
    fs::create_dir(&data_dir).unwrap();
    fs::write(data_dir.join("Patient.1.ndjson"), "{\"resourceType\":\"Patient\"}\n").unwrap();
    fs::write(data_dir.join("readme.json"), "{}").unwrap();
    fs::write(root.path().join("secret.txt"), "do not serve").unwrap();

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    let server = FileServer::new(addr, &data_dir, Duration::from_secs(5))
        .spawn(CancellationToken::new())
        .await
        .expect("spawn server");
    let base = format!("http://{}", server.local_addr());
    let client = reqwest::Client::new();

    // GET /status
    let resp = client.get(format!("{base}/status")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));

    // NDJSON file with the bulk data content type
    let resp = client
        .get(format!("{base}/Patient.1.ndjson"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/fhir+ndjson"
    );
    assert_eq!(resp.text().await.unwrap(), "{\"resourceType\":\"Patient\"}\n");

    // Other files get a guessed type
    let resp = client.get(format!("{base}/readme.json")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );

    // Missing file
    let resp = client
        .get(format!("{base}/Observation.ndjson"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Encoded traversal out of the data directory
    let resp = client
        .get(format!("{base}/..%2Fsecret.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.shutdown().await.expect("graceful shutdown");

    let after = reqwest::Client::new()
        .get(format!("{base}/status"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(after.is_err(), "server should stop accepting connections");
}

#[tokio::test]
async fn cancelling_the_token_stops_the_server() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cancel = CancellationToken::new();
    let server = FileServer::new(
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        dir.path(),
        Duration::from_secs(1),
    )
    .spawn(cancel.clone())
    .await
    .expect("spawn server");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), server.wait())
        .await
        .expect("server stops after cancellation")
        .expect("server exits cleanly");
}
