use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::blocking::Client;

/// Downloads `url` and returns the body as UTF-8 text.
///
/// Transport failures, non-2xx statuses and bodies that are not valid UTF-8
/// all come back as an error. Nothing is retried and there is no timeout.
pub fn fetch_text(url: &str) -> Result<String> {
    // block for as long as the transfer takes
    let client = Client::builder()
        .timeout(None)
        .build()
        .context("building HTTP client")?;

    info!("downloading {}", url);
    let body = client
        .get(url)
        .send()
        .with_context(|| format!("GET {}", url))?
        .error_for_status()
        .with_context(|| format!("GET {}", url))?
        .bytes()
        .with_context(|| format!("reading body from {}", url))?;
    debug!("received {} bytes from {}", body.len(), url);

    String::from_utf8(body.to_vec()).with_context(|| format!("decoding body from {} as UTF-8", url))
}

#[cfg(test)]
use std::io::{Read, Write};
#[cfg(test)]
use std::net::TcpListener;
#[cfg(test)]
use std::thread;
#[cfg(test)]
use std::time::Duration;

/// Answers a single request with `status` and `body`, then stops.
#[cfg(test)]
fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    serve_with_pause(status, body, Duration::ZERO)
}

/// Like `serve_once`, but sleeps for `pause` halfway through the body.
#[cfg(test)]
fn serve_with_pause(status: &'static str, body: Vec<u8>, pause: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            let (first, rest) = body.split_at(body.len() / 2);
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(first);
            let _ = stream.flush();
            thread::sleep(pause);
            let _ = stream.write_all(rest);
        }
    });
    format!("http://127.0.0.1:{}/people.csv", port)
}

#[test]
fn downloads_text() {
    let url = serve_once("200 OK", b"id,name,birthday\n1,Alice,05/12/1990\n".to_vec());

    assert_eq!(
        fetch_text(&url).unwrap(),
        "id,name,birthday\n1,Alice,05/12/1990\n"
    );
}

#[test]
fn slow_body_is_awaited() {
    let body = b"id,name,birthday\n1,Alice,05/12/1990\n2,Bob,06/07/1985\n";
    let url = serve_with_pause("200 OK", body.to_vec(), Duration::from_secs(2));

    assert_eq!(fetch_text(&url).unwrap().as_bytes(), &body[..]);
}

#[test]
fn error_status_fails() {
    let url = serve_once("404 Not Found", b"missing".to_vec());

    assert!(fetch_text(&url).is_err());
}

#[test]
fn invalid_utf8_fails() {
    let url = serve_once("200 OK", vec![b'i', b'd', 0xff, 0xfe]);

    let err = fetch_text(&url).unwrap_err();
    assert!(format!("{:#}", err).contains("UTF-8"));
}

#[test]
fn malformed_url_fails() {
    assert!(fetch_text("not a url").is_err());
}

#[test]
fn unreachable_host_fails() {
    // bind then drop so nothing is listening on the port
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    assert!(fetch_text(&format!("http://127.0.0.1:{}/", port)).is_err());
}
