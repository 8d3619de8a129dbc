//! Wire shapes returned by the RPC API and their mapping to core types.

use serde::Deserialize;

use mfsmirror_core::{ContentHash, EntryKind, RemoteEntry, RemoteError};

/// Body of a non-2xx answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiErrorBody {
    pub message: String,
}

/// One line of an `add` answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AddResponse {
    #[serde(default)]
    pub hash: Option<String>,
}

/// `files/ls` answer. `Entries` is `null` for an empty directory.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LsResponse {
    #[serde(default)]
    pub entries: Option<Vec<LsEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LsEntry {
    pub name: String,
    #[serde(rename = "Type", default)]
    pub kind: i64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub hash: String,
}

impl From<LsEntry> for RemoteEntry {
    fn from(e: LsEntry) -> Self {
        RemoteEntry {
            name: e.name,
            kind: if e.kind == 1 {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            size: e.size,
            hash: (!e.hash.is_empty()).then(|| ContentHash(e.hash)),
        }
    }
}

/// Map an error body to a [`RemoteError`], recognising missing paths.
pub(crate) fn classify_error(status: u16, body: &str, path: Option<&str>) -> RemoteError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.trim().to_owned(),
    };
    if message.contains("file does not exist") {
        return RemoteError::NotFound {
            path: path.unwrap_or_default().to_owned(),
        };
    }
    RemoteError::Api { message }
}

/// Last hash reported in a (possibly multi-line) `add` answer.
pub(crate) fn parse_add(body: &str) -> Result<ContentHash, RemoteError> {
    let mut found = None;
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let parsed: AddResponse =
            serde_json::from_str(line).map_err(|e| RemoteError::Decode(e.to_string()))?;
        if let Some(hash) = parsed.hash {
            found = Some(hash);
        }
    }
    found
        .map(ContentHash)
        .ok_or_else(|| RemoteError::Decode("add response carried no hash".to_owned()))
}

pub(crate) fn parse_ls(body: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
    let parsed: LsResponse =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
    Ok(parsed
        .entries
        .unwrap_or_default()
        .into_iter()
        .map(RemoteEntry::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn not_found_message_maps_to_not_found() {
        let body = r#"{"Message":"file does not exist","Code":0,"Type":"error"}"#;
        let err = classify_error(500, body, Some("/sync/x"));
        assert!(matches!(err, RemoteError::NotFound { ref path } if path == "/sync/x"));
    }

    #[rstest]
    #[case::json_message(
        500,
        r#"{"Message":"paths must start with a leading slash","Code":0,"Type":"error"}"#,
        "api error: paths must start with a leading slash"
    )]
    #[case::plain_text(404, "404 page not found\n", "api error: 404 page not found")]
    #[case::empty_body(502, "", "api error: HTTP 502")]
    fn other_bodies_stay_api_errors(#[case] status: u16, #[case] body: &str, #[case] shown: &str) {
        let err = classify_error(status, body, None);
        assert!(matches!(err, RemoteError::Api { .. }));
        assert_eq!(err.to_string(), shown);
    }

    #[test]
    fn add_takes_last_hash_line() {
        let body = concat!(
            r#"{"Name":"file","Bytes":262144}"#,
            "\n",
            r#"{"Name":"file","Hash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","Size":"6"}"#,
            "\n"
        );
        let hash = parse_add(body).unwrap();
        assert_eq!(hash.0, "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
    }

    #[test]
    fn add_without_hash_is_decode_error() {
        assert!(matches!(
            parse_add(r#"{"Name":"file"}"#),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn ls_null_entries_is_empty() {
        assert!(parse_ls(r#"{"Entries":null}"#).unwrap().is_empty());
    }

    #[test]
    fn ls_maps_kinds() {
        let body = r#"{"Entries":[
            {"Name":"a.txt","Type":0,"Size":3,"Hash":"QmA"},
            {"Name":"sub","Type":1,"Size":0,"Hash":"QmB"},
            {"Name":"bare","Type":0,"Size":0,"Hash":""}
        ]}"#;
        let entries = parse_ls(body).unwrap();
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].size, 3);
        assert_eq!(entries[1].kind, EntryKind::Directory);
        assert_eq!(entries[2].hash, None);
    }
}
