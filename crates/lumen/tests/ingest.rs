use lumen::{m3u, IngestOptions, LumenError, PlaylistIngestor};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const PLAYLIST: &str = "#EXTM3U
#EXTINF:-1 tvg-logo=\"L\" group-title=\"G\",Channel 1
http://x/1
#EXTINF:-1,Channel 2
http://x/2
#EXTINF:-1,Dangling
";

const RECIPE: &str =
    "hunter2|00112233445566778899aabbccddeeff|0f0e0d0c0b0a09080706050403020100|1000";

async fn setup_mock_server(body: Vec<u8>) -> (String, MockServer) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live.m3u"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&mock_server)
        .await;

    (format!("{}/live.m3u", mock_server.uri()), mock_server)
}

fn recipe_options(recipe: &str) -> IngestOptions {
    IngestOptions {
        decrypt_recipe: Some(recipe.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn ingest_plain_playlist() -> anyhow::Result<()> {
    let (uri, _server) = setup_mock_server(PLAYLIST.as_bytes().to_vec()).await;

    let entries = PlaylistIngestor::default()
        .ingest(&uri, &IngestOptions::default())
        .await;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "Channel 1");
    assert_eq!(entries[0].logo, "L");
    assert_eq!(entries[0].group, "G");
    assert_eq!(entries[1].group, "Default");
    for entry in &entries {
        assert_eq!(entry.id, entry.url);
    }
    Ok(())
}

#[tokio::test]
async fn ingest_encrypted_playlist() -> anyhow::Result<()> {
    let encrypted = m3u::encrypt(PLAYLIST.as_bytes(), RECIPE)?;
    let (uri, _server) = setup_mock_server(encrypted).await;

    let entries = PlaylistIngestor::default()
        .ingest(&uri, &recipe_options(RECIPE))
        .await;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].url, "http://x/2");
    Ok(())
}

#[tokio::test]
async fn ingest_wrong_password_is_empty() -> anyhow::Result<()> {
    let encrypted = m3u::encrypt(PLAYLIST.as_bytes(), RECIPE)?;
    let (uri, _server) = setup_mock_server(encrypted).await;
    let wrong = RECIPE.replacen("hunter2", "hunter3", 1);

    let ingestor = PlaylistIngestor::default();
    assert!(ingestor.ingest(&uri, &recipe_options(&wrong)).await.is_empty());

    let error = ingestor
        .try_ingest(&uri, &recipe_options(&wrong))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        LumenError::Decrypt(m3u::DecryptError::CipherMismatch)
    ));
    Ok(())
}

#[tokio::test]
async fn ingest_malformed_recipe_is_empty() -> anyhow::Result<()> {
    let (uri, _server) = setup_mock_server(PLAYLIST.as_bytes().to_vec()).await;

    let ingestor = PlaylistIngestor::default();
    let options = recipe_options("hunter2|0011");
    assert!(ingestor.ingest(&uri, &options).await.is_empty());
    assert!(matches!(
        ingestor.try_ingest(&uri, &options).await,
        Err(LumenError::Decrypt(m3u::DecryptError::MalformedRecipe(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn ingest_http_error_is_empty() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.m3u"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;
    let uri = format!("{}/missing.m3u", mock_server.uri());

    let ingestor = PlaylistIngestor::default();
    assert!(ingestor
        .ingest(&uri, &IngestOptions::default())
        .await
        .is_empty());
    assert!(matches!(
        ingestor.try_ingest(&uri, &IngestOptions::default()).await,
        Err(LumenError::HttpError(status)) if status.as_u16() == 404
    ));
    Ok(())
}

#[tokio::test]
async fn ingest_unreachable_is_empty() {
    let entries = PlaylistIngestor::default()
        .ingest("http://127.0.0.1:9/live.m3u", &IngestOptions::default())
        .await;
    assert!(entries.is_empty());
}

#[tokio::test]
async fn ingest_sends_user_agent() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live.m3u"))
        .and(header("user-agent", "LumenTV/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAYLIST))
        .mount(&mock_server)
        .await;
    let uri = format!("{}/live.m3u", mock_server.uri());

    let ingestor = PlaylistIngestor::default();
    let options = IngestOptions {
        user_agent: Some("LumenTV/1.0".to_string()),
        ..Default::default()
    };
    assert_eq!(ingestor.ingest(&uri, &options).await.len(), 2);

    // without the header the mock does not match and wiremock answers 404
    assert!(ingestor
        .ingest(&uri, &IngestOptions::default())
        .await
        .is_empty());
    Ok(())
}
