//! WebDAV client tests against a wiremock server.
//!
//! These cover the wire contract: PROPFIND with Depth 1 and Basic auth for
//! connection tests and listings, PUT with the media type for uploads.

use davdrop::providers::{DavBackend, DavError, FolderEntry, MediaBlob, WebDavClient};
use davdrop::Credentials;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// base64("u:p")
const BASIC_U_P: &str = "Basic dTpw";

fn creds(server: &MockServer) -> Credentials {
    Credentials::new(&server.uri(), "u", "p")
}

fn dav_response(href: &str, collection: bool) -> String {
    let resourcetype = if collection { "<d:collection/>" } else { "" };
    format!(
        r#"<d:response>
  <d:href>{}</d:href>
  <d:propstat>
    <d:prop><d:resourcetype>{}</d:resourcetype></d:prop>
    <d:status>HTTP/1.1 200 OK</d:status>
  </d:propstat>
</d:response>"#,
        href, resourcetype
    )
}

fn multistatus(responses: &[String]) -> String {
    format!(
        r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:s="http://sabredav.org/ns" xmlns:oc="http://owncloud.org/ns">
{}
</d:multistatus>"#,
        responses.join("\n")
    )
}

#[tokio::test]
async fn test_connection_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/webdav/"))
        .and(header("Depth", "1"))
        .and(header("Authorization", BASIC_U_P))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WebDavClient::new().unwrap();
    assert!(client.test_connection(&creds(&mock_server)).await);
}

#[tokio::test]
async fn test_connection_rejected_statuses_return_false() {
    for status in [401u16, 404] {
        let mock_server = MockServer::start().await;
        Mock::given(method("PROPFIND"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&mock_server)
            .await;

        let client = WebDavClient::new().unwrap();
        assert!(
            !client.test_connection(&creds(&mock_server)).await,
            "status {} should fail the connection test",
            status
        );
    }
}

#[tokio::test]
async fn test_connection_transport_failure_returns_false() {
    let client = WebDavClient::new().unwrap();
    // Nothing listens on the discard port
    let creds = Credentials::new("http://127.0.0.1:9", "u", "p");
    assert!(!client.test_connection(&creds).await);
}

#[tokio::test]
async fn test_list_folders_returns_collections_only() {
    let mock_server = MockServer::start().await;

    let body = multistatus(&[
        dav_response("/remote.php/webdav/Photos/", true),
        dav_response("/remote.php/webdav/Photos/2023/", true),
        dav_response("/remote.php/webdav/Photos/Holiday%20Trip/", true),
        dav_response("/remote.php/webdav/Photos/Screens/", true),
        dav_response("/remote.php/webdav/Photos/a.png", false),
        dav_response("/remote.php/webdav/Photos/notes.txt", false),
    ]);

    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/webdav/Photos"))
        .and(header("Depth", "1"))
        .and(header("Authorization", BASIC_U_P))
        .respond_with(ResponseTemplate::new(207).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WebDavClient::new().unwrap();
    let folders = client.list_folders(&creds(&mock_server), "/Photos").await.unwrap();

    assert_eq!(
        folders,
        vec![
            FolderEntry::new("2023"),
            FolderEntry::new("Holiday Trip"),
            FolderEntry::new("Screens"),
        ]
    );
}

#[tokio::test]
async fn test_list_folders_error_status_is_loud() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = WebDavClient::new().unwrap();
    let result = client.list_folders(&creds(&mock_server), "/Missing").await;

    match result {
        Err(DavError::Status(status)) => assert_eq!(status.as_u16(), 404),
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_folders_malformed_body_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string("<d:multistatus xmlns:d=\"DAV:\"><d:response><d:href>/x/</d:multistatus>"),
        )
        .mount(&mock_server)
        .await;

    let client = WebDavClient::new().unwrap();
    let folders = client.list_folders(&creds(&mock_server), "/").await.unwrap();
    assert!(folders.is_empty());
}

#[tokio::test]
async fn test_list_folders_transport_failure_is_empty() {
    let client = WebDavClient::new().unwrap();
    let creds = Credentials::new("http://127.0.0.1:9", "u", "p");
    let folders = client.list_folders(&creds, "/").await.unwrap();
    assert!(folders.is_empty());
}

#[tokio::test]
async fn test_upload_puts_with_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/remote.php/webdav/Photos/a_1_abcdef.png"))
        .and(header("Authorization", BASIC_U_P))
        .and(header("Content-Type", "image/png"))
        .and(body_bytes(vec![1u8, 2, 3]))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WebDavClient::new().unwrap();
    let status = client
        .upload(
            &creds(&mock_server),
            "/Photos/",
            "a_1_abcdef.png",
            MediaBlob::new(vec![1, 2, 3], "image/png"),
        )
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 201);
}

#[tokio::test]
async fn test_upload_returns_error_status_to_caller() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&mock_server)
        .await;

    let client = WebDavClient::new().unwrap();
    let status = client
        .upload(&creds(&mock_server), "/", "a.png", MediaBlob::new(vec![0], "image/png"))
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 507);
}
