//! XML-RPC wire codec for the notary protocol.
//!
//! The protocol is deliberately small: every argument and return value is
//! a string or an int, multi-value returns are a flat `<array>`, and the
//! four procedure names are fixed. Both sides of the handshake use this
//! module, so a client and server built from it interoperate with any
//! other implementation of the same contract.

use std::fmt;

/// A decoding failure or a server-reported fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    Malformed(String),
    Fault { code: i64, message: String },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Malformed(msg) => write!(f, "malformed XML-RPC payload: {msg}"),
            WireError::Fault { code, message } => write!(f, "fault {code}: {message}"),
        }
    }
}

impl std::error::Error for WireError {}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Inner text of the first `<tag>…</tag>` in `s`.
fn tag_inner<'a>(s: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = s.find(&open)? + open.len();
    let end = s[start..].find(&close)? + start;
    Some(&s[start..end])
}

/// Decode one scalar `<value>` body: typed string/int/boolean, or untyped
/// text (which XML-RPC defines as a string).
fn scalar(value_inner: &str) -> String {
    let trimmed = value_inner.trim();
    if let Some(inner) = tag_inner(trimmed, "string") {
        return unescape(inner);
    }
    for int_tag in ["int", "i4"] {
        if let Some(inner) = tag_inner(trimmed, int_tag) {
            return inner.trim().to_string();
        }
    }
    if let Some(inner) = tag_inner(trimmed, "boolean") {
        return match inner.trim() {
            "1" => "True".to_string(),
            _ => "False".to_string(),
        };
    }
    unescape(trimmed)
}

/// Collect the scalar `<value>` bodies of `s`, in order. Only valid where
/// values are flat (inside `<data>` or across `<param>`s).
fn scalar_values(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("<value>") {
        let after = &rest[start + "<value>".len()..];
        let Some(end) = after.find("</value>") else { break };
        out.push(scalar(&after[..end]));
        rest = &after[end + "</value>".len()..];
    }
    out
}

/// Encode a `methodCall` with string parameters.
pub fn encode_call(method: &str, params: &[&str]) -> String {
    let mut body = String::from("<?xml version=\"1.0\"?>\n<methodCall>\n");
    body.push_str(&format!("<methodName>{}</methodName>\n<params>\n", escape(method)));
    for p in params {
        body.push_str(&format!(
            "<param><value><string>{}</string></value></param>\n",
            escape(p)
        ));
    }
    body.push_str("</params>\n</methodCall>\n");
    body
}

/// Encode a successful `methodResponse`. A single value is returned as a
/// scalar param; multiple values as one flat array param (matching how
/// tuple-returning handlers marshal).
pub fn encode_response(values: &[&str]) -> String {
    let payload = match values {
        [single] => format!("<value><string>{}</string></value>", escape(single)),
        many => {
            let items: String = many
                .iter()
                .map(|v| format!("<value><string>{}</string></value>", escape(v)))
                .collect();
            format!("<value><array><data>{items}</data></array></value>")
        }
    };
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse>\n<params>\n<param>{payload}</param>\n</params>\n</methodResponse>\n"
    )
}

/// Encode a fault `methodResponse`.
pub fn encode_fault(code: i64, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodResponse>\n<fault>\n<value><struct>\
         <member><name>faultCode</name><value><int>{code}</int></value></member>\
         <member><name>faultString</name><value><string>{}</string></value></member>\
         </struct></value>\n</fault>\n</methodResponse>\n",
        escape(message)
    )
}

/// Decode a `methodResponse` into its value list. Faults come back as
/// `WireError::Fault`.
pub fn decode_response(body: &str) -> Result<Vec<String>, WireError> {
    let response = tag_inner(body, "methodResponse")
        .ok_or_else(|| WireError::Malformed("no methodResponse element".into()))?;
    if let Some(fault) = tag_inner(response, "fault") {
        let code = fault
            .find("faultCode")
            .and_then(|at| {
                let after = &fault[at..];
                tag_inner(after, "int").or_else(|| tag_inner(after, "i4"))
            })
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0);
        let message = fault
            .find("faultString")
            .and_then(|at| tag_inner(&fault[at..], "string"))
            .map(unescape)
            .unwrap_or_else(|| "unspecified fault".to_string());
        return Err(WireError::Fault { code, message });
    }
    let params = tag_inner(response, "params")
        .ok_or_else(|| WireError::Malformed("no params element".into()))?;
    // Multi-value responses arrive as one array param.
    if let Some(data) = tag_inner(params, "data") {
        return Ok(scalar_values(data));
    }
    Ok(scalar_values(params))
}

/// Decode a `methodCall` into (method name, parameter list).
pub fn decode_call(body: &str) -> Result<(String, Vec<String>), WireError> {
    let call = tag_inner(body, "methodCall")
        .ok_or_else(|| WireError::Malformed("no methodCall element".into()))?;
    let method = tag_inner(call, "methodName")
        .map(|m| unescape(m.trim()))
        .ok_or_else(|| WireError::Malformed("no methodName element".into()))?;
    let params = match tag_inner(call, "params") {
        Some(p) => scalar_values(p),
        None => Vec::new(),
    };
    Ok((method, params))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
