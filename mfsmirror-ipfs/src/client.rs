//! [`MfsApi`] over HTTP.

use std::io::Read;
use std::time::Duration;

use mfsmirror_core::{AddOptions, ContentHash, MfsApi, MfsPath, RemoteEntry, RemoteError};

use crate::multipart::FilePart;
use crate::response::{classify_error, parse_add, parse_ls};

/// Blocking client for one IPFS node's RPC endpoint.
///
/// Every request is a `POST` to `<base>/api/v0/<command>`.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    agent: ureq::Agent,
    base: String,
}

/// A prepared RPC call.
struct Call<'a> {
    command: &'static str,
    args: Vec<String>,
    options: Vec<(&'static str, String)>,
    /// Path reported in `NotFound` errors.
    subject: Option<&'a MfsPath>,
}

impl<'a> Call<'a> {
    fn new(command: &'static str) -> Self {
        Self {
            command,
            args: Vec::new(),
            options: Vec::new(),
            subject: None,
        }
    }

    fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    fn path(mut self, path: &'a MfsPath) -> Self {
        self.args.push(path.to_string());
        self.subject = Some(path);
        self
    }

    fn flag(mut self, name: &'static str, value: bool) -> Self {
        self.options.push((name, value.to_string()));
        self
    }
}

impl IpfsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{command}", self.base)
    }

    fn request(&self, call: &Call<'_>) -> ureq::Request {
        let mut request = self.agent.post(&self.endpoint(call.command));
        for arg in &call.args {
            request = request.query("arg", arg);
        }
        for (name, value) in &call.options {
            request = request.query(name, value);
        }
        tracing::debug!(command = call.command, args = ?call.args, "ipfs request");
        request
    }

    /// Send `call` without a body.
    fn send(&self, call: Call<'_>) -> Result<String, RemoteError> {
        let result = self.request(&call).call();
        answer(&call, result)
    }
}

/// Turn a ureq outcome into the answer body or a [`RemoteError`].
fn answer(
    call: &Call<'_>,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<String, RemoteError> {
    match result {
        Ok(response) => response
            .into_string()
            .map_err(|e| RemoteError::Decode(e.to_string())),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(classify_error(
                status,
                &body,
                call.subject.map(MfsPath::as_str),
            ))
        }
        Err(ureq::Error::Transport(transport)) => {
            Err(RemoteError::Transport(transport.to_string()))
        }
    }
}

impl MfsApi for IpfsClient {
    fn add(
        &self,
        content: &mut dyn Read,
        options: AddOptions,
    ) -> Result<ContentHash, RemoteError> {
        let call = Call::new("add")
            .flag("pin", false)
            .flag("only-hash", options.only_hash)
            .flag("quieter", true);
        let form = FilePart::new();
        let result = self
            .request(&call)
            .set("Content-Type", &form.content_type())
            .send(form.stream(content));
        parse_add(&answer(&call, result)?)
    }

    fn mkdir_all(&self, path: &MfsPath, durable: bool) -> Result<(), RemoteError> {
        let call = Call::new("files/mkdir")
            .path(path)
            .flag("parents", true)
            .flag("flush", durable);
        self.send(call).map(drop)
    }

    fn remove_recursive(&self, path: &MfsPath, durable: bool) -> Result<(), RemoteError> {
        let call = Call::new("files/rm")
            .path(path)
            .flag("recursive", true)
            .flag("flush", durable);
        self.send(call).map(drop)
    }

    fn bind_content(
        &self,
        hash: &ContentHash,
        path: &MfsPath,
        durable: bool,
    ) -> Result<(), RemoteError> {
        let call = Call::new("files/cp")
            .arg(hash.ipfs_path())
            .path(path)
            .flag("flush", durable);
        self.send(call).map(drop)
    }

    fn list_children(&self, path: &MfsPath) -> Result<Vec<RemoteEntry>, RemoteError> {
        let call = Call::new("files/ls")
            .path(path)
            .flag("U", true)
            .flag("long", true);
        let body = self.send(call)?;
        parse_ls(&body)
    }

    fn flush(&self, path: &MfsPath) -> Result<(), RemoteError> {
        self.send(Call::new("files/flush").path(path)).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfsmirror_core::EntryKind;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// What the node saw.
    struct Received {
        path: String,
        query: Vec<(String, String)>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Received {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    fn percent_decode(raw: &str) -> String {
        let bytes = raw.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'%' if i + 2 < bytes.len() => {
                    let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                    out.push(u8::from_str_radix(hex, 16).unwrap());
                    i += 3;
                }
                b'+' => {
                    out.push(b' ');
                    i += 1;
                }
                b => {
                    out.push(b);
                    i += 1;
                }
            }
        }
        String::from_utf8(out).unwrap()
    }

    fn read_body(reader: &mut impl BufRead, headers: &[(String, String)]) -> Vec<u8> {
        let header = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        };
        let mut body = Vec::new();
        if let Some(len) = header("content-length") {
            body.resize(len.parse().unwrap(), 0);
            reader.read_exact(&mut body).unwrap();
        } else if header("transfer-encoding").is_some_and(|v| v.contains("chunked")) {
            loop {
                let mut size_line = String::new();
                reader.read_line(&mut size_line).unwrap();
                let size = usize::from_str_radix(size_line.trim(), 16).unwrap();
                let mut chunk = vec![0; size + 2];
                reader.read_exact(&mut chunk).unwrap();
                if size == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..size]);
            }
        }
        body
    }

    /// Accept one request, answer it with `status` and `reply`, and hand
    /// back what was received.
    fn serve_once(status: u16, reply: &'static str) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let target = request_line.split_whitespace().nth(1).unwrap().to_owned();
            let (path, raw_query) = target.split_once('?').unwrap_or((&target, ""));
            let query = raw_query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                    (percent_decode(k), percent_decode(v))
                })
                .collect();

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let (k, v) = line.split_once(':').unwrap();
                headers.push((k.trim().to_owned(), v.trim().to_owned()));
            }
            let body = read_body(&mut reader, &headers);

            let reason = if status == 200 { "OK" } else { "Internal Server Error" };
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status} {reason}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{reply}",
                reply.len()
            )
            .unwrap();
            stream.flush().unwrap();

            Received {
                path: path.to_owned(),
                query,
                headers,
                body,
            }
        });
        (base, handle)
    }

    fn client(base: &str) -> IpfsClient {
        IpfsClient::new(base, Duration::from_secs(5))
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn p(s: &str) -> MfsPath {
        MfsPath::parse(s).unwrap()
    }

    #[test]
    fn add_streams_multipart_form_and_reads_hash() {
        let (base, node) = serve_once(200, r#"{"Name":"file","Hash":"QmNew","Size":"13"}"#);
        let mut content: &[u8] = b"hello, world!";

        let hash = client(&base)
            .add(&mut content, AddOptions { only_hash: true })
            .unwrap();

        let seen = node.join().unwrap();
        assert_eq!(hash, ContentHash::from("QmNew"));
        assert_eq!(seen.path, "/api/v0/add");
        assert_eq!(
            seen.query,
            pairs(&[("pin", "false"), ("only-hash", "true"), ("quieter", "true")])
        );
        let content_type = seen.header("content-type").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = String::from_utf8(seen.body.clone()).unwrap();
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("\r\n\r\nhello, world!\r\n"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn mkdir_sends_parents_and_flush() {
        let (base, node) = serve_once(200, "");
        client(&base).mkdir_all(&p("/sync/a b"), false).unwrap();

        let seen = node.join().unwrap();
        assert_eq!(seen.path, "/api/v0/files/mkdir");
        assert_eq!(
            seen.query,
            pairs(&[("arg", "/sync/a b"), ("parents", "true"), ("flush", "false")])
        );
    }

    #[test]
    fn remove_is_recursive_and_durable_on_request() {
        let (base, node) = serve_once(200, "");
        client(&base).remove_recursive(&p("/sync/old"), true).unwrap();

        let seen = node.join().unwrap();
        assert_eq!(seen.path, "/api/v0/files/rm");
        assert_eq!(
            seen.query,
            pairs(&[("arg", "/sync/old"), ("recursive", "true"), ("flush", "true")])
        );
    }

    #[test]
    fn remove_of_missing_path_is_not_found() {
        let (base, node) = serve_once(
            500,
            r#"{"Message":"file does not exist","Code":0,"Type":"error"}"#,
        );
        let err = client(&base)
            .remove_recursive(&p("/sync/gone"), false)
            .unwrap_err();
        node.join().unwrap();
        assert!(
            matches!(err, RemoteError::NotFound { ref path } if path == "/sync/gone"),
            "got: {err}"
        );
    }

    #[test]
    fn copy_passes_source_before_destination() {
        let (base, node) = serve_once(200, "");
        client(&base)
            .bind_content(&ContentHash::from("QmA"), &p("/sync/a.txt"), true)
            .unwrap();

        let seen = node.join().unwrap();
        assert_eq!(seen.path, "/api/v0/files/cp");
        assert_eq!(
            seen.query,
            pairs(&[("arg", "/ipfs/QmA"), ("arg", "/sync/a.txt"), ("flush", "true")])
        );
    }

    #[test]
    fn list_requests_long_unsorted_listing() {
        let (base, node) = serve_once(
            200,
            r#"{"Entries":[{"Name":"a.txt","Type":0,"Size":5,"Hash":"QmA"},{"Name":"sub","Type":1,"Size":0,"Hash":"QmB"}]}"#,
        );
        let entries = client(&base).list_children(&p("/sync")).unwrap();

        let seen = node.join().unwrap();
        assert_eq!(seen.path, "/api/v0/files/ls");
        assert_eq!(
            seen.query,
            pairs(&[("arg", "/sync"), ("U", "true"), ("long", "true")])
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[1].kind, EntryKind::Directory);
    }

    #[test]
    fn flush_names_only_the_path() {
        let (base, node) = serve_once(200, r#"{"Cid":"QmRoot"}"#);
        client(&base).flush(&p("/sync")).unwrap();

        let seen = node.join().unwrap();
        assert_eq!(seen.path, "/api/v0/files/flush");
        assert_eq!(seen.query, pairs(&[("arg", "/sync")]));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = IpfsClient::new("http://127.0.0.1:5001/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://127.0.0.1:5001");
        assert_eq!(
            client.endpoint("files/ls"),
            "http://127.0.0.1:5001/api/v0/files/ls"
        );
    }

    #[test]
    fn call_builder_orders_args() {
        let dest = MfsPath::parse("/sync/a.txt").unwrap();
        let call = Call::new("files/cp")
            .arg("/ipfs/QmA")
            .path(&dest)
            .flag("flush", false);
        assert_eq!(call.args, vec!["/ipfs/QmA", "/sync/a.txt"]);
        assert_eq!(call.options, vec![("flush", "false".to_owned())]);
        assert_eq!(call.subject, Some(&dest));
    }

    #[test]
    fn unreachable_node_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = IpfsClient::new("http://127.0.0.1:9", Duration::from_secs(2));
        let err = client.flush(&MfsPath::root()).unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)), "got: {err}");
    }
}
