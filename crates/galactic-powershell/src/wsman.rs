//! WS-Management (WinRM) shell messages
//!
//! A remote command is a shell `Create`, a `Command`, repeated `Receive`s
//! until the command state is `Done`, a terminate `Signal` and a `Delete`.

use crate::error::{PowerShellError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::time::Duration;
use uuid::Uuid;

pub const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
pub const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
pub const ACTION_COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
pub const ACTION_RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
pub const ACTION_SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";

const RESOURCE_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";
const SIGNAL_TERMINATE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";
const STATE_DONE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done";
const ANONYMOUS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// WSManFault code sent when a `Receive` waited out its operation timeout
pub const FAULT_TIMED_OUT: &str = "2150858793";

/// Fixed parts of every envelope for one endpoint
#[derive(Debug, Clone)]
pub struct EnvelopeSettings {
    pub endpoint: String,
    pub max_envelope_size: u32,
    pub operation_timeout: Duration,
    pub locale: String,
}

/// `PowerShell.exe` reads `-EncodedCommand` as base64 of UTF-16LE
pub fn encode_command(script: &str) -> String {
    let utf16: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    BASE64.encode(utf16)
}

fn selector(shell_id: &str) -> String {
    format!(
        "<w:SelectorSet><w:Selector Name=\"ShellId\">{}</w:Selector></w:SelectorSet>",
        escape(shell_id)
    )
}

fn options(pairs: &[(&str, &str)]) -> String {
    let mut out = String::from("<w:OptionSet>");
    for (name, value) in pairs {
        out.push_str(&format!("<w:Option Name=\"{}\">{}</w:Option>", name, value));
    }
    out.push_str("</w:OptionSet>");
    out
}

impl EnvelopeSettings {
    fn envelope(&self, action: &str, extra_headers: &str, body: &str) -> String {
        format!(
            concat!(
                "<s:Envelope xmlns:s=\"http://www.w3.org/2003/05/soap-envelope\" ",
                "xmlns:a=\"http://schemas.xmlsoap.org/ws/2004/08/addressing\" ",
                "xmlns:w=\"http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd\" ",
                "xmlns:rsp=\"http://schemas.microsoft.com/wbem/wsman/1/windows/shell\">",
                "<s:Header>",
                "<a:To>{to}</a:To>",
                "<a:ReplyTo><a:Address s:mustUnderstand=\"true\">{anonymous}</a:Address></a:ReplyTo>",
                "<w:MaxEnvelopeSize s:mustUnderstand=\"true\">{max_size}</w:MaxEnvelopeSize>",
                "<a:MessageID>uuid:{message_id}</a:MessageID>",
                "<w:Locale xml:lang=\"{locale}\" s:mustUnderstand=\"false\"/>",
                "<w:OperationTimeout>PT{timeout}S</w:OperationTimeout>",
                "<w:ResourceURI s:mustUnderstand=\"true\">{resource}</w:ResourceURI>",
                "<a:Action s:mustUnderstand=\"true\">{action}</a:Action>",
                "{extra}",
                "</s:Header>",
                "<s:Body>{body}</s:Body>",
                "</s:Envelope>"
            ),
            to = escape(&self.endpoint),
            anonymous = ANONYMOUS,
            max_size = self.max_envelope_size,
            message_id = Uuid::new_v4().to_string().to_uppercase(),
            locale = escape(&self.locale),
            timeout = self.operation_timeout.as_secs().max(1),
            resource = RESOURCE_CMD,
            action = action,
            extra = extra_headers,
            body = body,
        )
    }

    pub fn create_shell(&self) -> String {
        let headers = options(&[("WINRS_NOPROFILE", "TRUE"), ("WINRS_CODEPAGE", "65001")]);
        let body = concat!(
            "<rsp:Shell>",
            "<rsp:InputStreams>stdin</rsp:InputStreams>",
            "<rsp:OutputStreams>stdout stderr</rsp:OutputStreams>",
            "</rsp:Shell>"
        );
        self.envelope(ACTION_CREATE, &headers, body)
    }

    /// Run `script` through `powershell.exe -EncodedCommand`
    pub fn command(&self, shell_id: &str, script: &str) -> String {
        let headers = format!(
            "{}{}",
            selector(shell_id),
            options(&[("WINRS_CONSOLEMODE_STDIN", "TRUE"), ("WINRS_SKIP_CMD_SHELL", "FALSE")])
        );
        let body = format!(
            concat!(
                "<rsp:CommandLine>",
                "<rsp:Command>powershell.exe</rsp:Command>",
                "<rsp:Arguments>-NoProfile -NonInteractive -EncodedCommand {}</rsp:Arguments>",
                "</rsp:CommandLine>"
            ),
            encode_command(script)
        );
        self.envelope(ACTION_COMMAND, &headers, &body)
    }

    pub fn receive(&self, shell_id: &str, command_id: &str) -> String {
        let body = format!(
            "<rsp:Receive><rsp:DesiredStream CommandId=\"{}\">stdout stderr</rsp:DesiredStream></rsp:Receive>",
            escape(command_id)
        );
        self.envelope(ACTION_RECEIVE, &selector(shell_id), &body)
    }

    pub fn terminate(&self, shell_id: &str, command_id: &str) -> String {
        let body = format!(
            "<rsp:Signal CommandId=\"{}\"><rsp:Code>{}</rsp:Code></rsp:Signal>",
            escape(command_id),
            SIGNAL_TERMINATE
        );
        self.envelope(ACTION_SIGNAL, &selector(shell_id), &body)
    }

    pub fn delete_shell(&self, shell_id: &str) -> String {
        self.envelope(ACTION_DELETE, &selector(shell_id), "")
    }
}

/// Output of one `Receive`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiveOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub done: bool,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// WSManFault code when present, else the SOAP subcode
    pub code: String,
    pub reason: String,
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

pub(crate) fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| PowerShellError::Response(e.to_string()))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

pub(crate) enum Node<'a, 'x> {
    Start(&'a BytesStart<'x>),
    Text(Cow<'a, str>),
}

/// Walk `xml`, passing each element start and text node to `visit` with the
/// names of the open elements
pub(crate) fn walk<F>(xml: &str, mut visit: F) -> Result<()>
where
    F: FnMut(&[String], Node<'_, '_>) -> Result<()>,
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut path: Vec<String> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(local_name(&e));
                visit(&path, Node::Start(&e))?;
            }
            Event::Empty(e) => {
                path.push(local_name(&e));
                visit(&path, Node::Start(&e))?;
                path.pop();
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => visit(&path, Node::Text(t.unescape()?))?,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn current(path: &[String]) -> &str {
    path.last().map(String::as_str).unwrap_or("")
}

/// `ShellId` from a `Create` response
pub fn parse_shell_id(xml: &str) -> Result<String> {
    let mut shell_id = None;
    let mut selector_is_shell = false;
    walk(xml, |path, node| {
        let name = current(path);
        match node {
            Node::Start(e) if name == "Selector" => {
                selector_is_shell = attribute(e, "Name")?.as_deref() == Some("ShellId");
            }
            Node::Text(text) if name == "ShellId" || (name == "Selector" && selector_is_shell) => {
                shell_id.get_or_insert_with(|| text.into_owned());
            }
            _ => {}
        }
        Ok(())
    })?;
    shell_id.ok_or_else(|| PowerShellError::Response("no ShellId in Create response".to_string()))
}

/// `CommandId` from a `Command` response
pub fn parse_command_id(xml: &str) -> Result<String> {
    let mut command_id = None;
    walk(xml, |path, node| {
        if let Node::Text(text) = node {
            if current(path) == "CommandId" {
                command_id.get_or_insert_with(|| text.into_owned());
            }
        }
        Ok(())
    })?;
    command_id.ok_or_else(|| PowerShellError::Response("no CommandId in Command response".to_string()))
}

pub fn parse_receive(xml: &str) -> Result<ReceiveOutput> {
    let mut output = ReceiveOutput::default();
    let mut stream = String::new();
    walk(xml, |path, node| {
        match (current(path), node) {
            ("Stream", Node::Start(e)) => stream = attribute(e, "Name")?.unwrap_or_default(),
            ("CommandState", Node::Start(e)) => {
                output.done = attribute(e, "State")?.as_deref() == Some(STATE_DONE);
            }
            ("Stream", Node::Text(text)) => {
                let bytes = BASE64
                    .decode(text.trim())
                    .map_err(|e| PowerShellError::Response(format!("stream is not base64: {}", e)))?;
                match stream.as_str() {
                    "stdout" => output.stdout.extend(bytes),
                    "stderr" => output.stderr.extend(bytes),
                    _ => {}
                }
            }
            ("ExitCode", Node::Text(text)) => {
                let code = text.trim().parse::<i32>().map_err(|e| {
                    PowerShellError::Response(format!("invalid ExitCode {:?}: {}", text, e))
                })?;
                output.exit_code = Some(code);
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(output)
}

/// SOAP fault carried in an error response body, if any
pub fn parse_fault(xml: &str) -> Option<Fault> {
    let mut in_fault = false;
    let mut wsman_code = None;
    let mut subcode = None;
    let mut reason = None;
    let mut message = None;
    walk(xml, |path, node| {
        let under = |name: &str| path.iter().any(|p| p == name);
        match (current(path), node) {
            ("Fault", Node::Start(_)) => in_fault = true,
            ("WSManFault", Node::Start(e)) => wsman_code = attribute(e, "Code")?,
            ("Value", Node::Text(text)) if under("Subcode") => subcode = Some(text.into_owned()),
            ("Text", Node::Text(text)) if under("Reason") => reason = Some(text.trim().to_string()),
            ("Message", Node::Text(text)) if under("WSManFault") => {
                message.get_or_insert_with(|| text.trim().to_string());
            }
            _ => {}
        }
        Ok(())
    })
    .ok()?;
    if !in_fault {
        return None;
    }
    Some(Fault {
        code: wsman_code.or(subcode).unwrap_or_else(|| "unknown".to_string()),
        reason: message.or(reason).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EnvelopeSettings {
        EnvelopeSettings {
            endpoint: "https://host.example.com:5986/wsman".to_string(),
            max_envelope_size: 153600,
            operation_timeout: Duration::from_secs(20),
            locale: "en-US".to_string(),
        }
    }

    #[test]
    fn test_encode_command_is_utf16le() {
        // "a" -> 61 00
        assert_eq!(encode_command("a"), "YQA=");
        assert_eq!(encode_command("Get-Date"), "RwBlAHQALQBEAGEAdABlAA==");
    }

    #[test]
    fn test_command_envelope() {
        let xml = settings().command("SHELL-1", "Get-Date");
        assert!(xml.contains(ACTION_COMMAND));
        assert!(xml.contains("<w:Selector Name=\"ShellId\">SHELL-1</w:Selector>"));
        assert!(xml.contains("-EncodedCommand RwBlAHQALQBEAGEAdABlAA=="));
        assert!(xml.contains("<w:OperationTimeout>PT20S</w:OperationTimeout>"));
        assert!(xml.contains("<a:To>https://host.example.com:5986/wsman</a:To>"));
    }

    #[test]
    fn test_ids_are_escaped() {
        let xml = settings().receive("a<b", "c\"d");
        assert!(xml.contains("a&lt;b"));
        assert!(xml.contains("CommandId=\"c&quot;d\""));
    }

    #[test]
    fn test_parse_shell_id() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell"><s:Body><rsp:Shell><rsp:ShellId>11AA-22BB</rsp:ShellId></rsp:Shell></s:Body></s:Envelope>"#;
        assert_eq!(parse_shell_id(body).unwrap(), "11AA-22BB");

        let selector_only = r#"<s:Envelope xmlns:s="x" xmlns:w="y"><s:Body><x:ResourceCreated xmlns:x="z"><w:SelectorSet><w:Selector Name="ShellId">33CC</w:Selector></w:SelectorSet></x:ResourceCreated></s:Body></s:Envelope>"#;
        assert_eq!(parse_shell_id(selector_only).unwrap(), "33CC");

        assert!(parse_shell_id("<s:Envelope xmlns:s=\"x\"/>").is_err());
    }

    #[test]
    fn test_parse_receive() {
        let body = format!(
            r#"<s:Envelope xmlns:s="x" xmlns:rsp="y"><s:Body><rsp:ReceiveResponse>
            <rsp:Stream Name="stdout" CommandId="C1">aGVsbG8K</rsp:Stream>
            <rsp:Stream Name="stderr" CommandId="C1">b29wcw==</rsp:Stream>
            <rsp:Stream Name="stdout" CommandId="C1" End="true"></rsp:Stream>
            <rsp:CommandState CommandId="C1" State="{}"><rsp:ExitCode>3</rsp:ExitCode></rsp:CommandState>
            </rsp:ReceiveResponse></s:Body></s:Envelope>"#,
            STATE_DONE
        );
        let output = parse_receive(&body).unwrap();
        assert_eq!(output.stdout, b"hello\n");
        assert_eq!(output.stderr, b"oops");
        assert!(output.done);
        assert_eq!(output.exit_code, Some(3));

        let running = r#"<s:Envelope xmlns:s="x" xmlns:rsp="y"><s:Body><rsp:ReceiveResponse><rsp:CommandState CommandId="C1" State="http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Running"/></rsp:ReceiveResponse></s:Body></s:Envelope>"#;
        let output = parse_receive(running).unwrap();
        assert!(!output.done);
        assert_eq!(output.exit_code, None);
    }

    #[test]
    fn test_parse_fault() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:w="w" xmlns:f="http://schemas.microsoft.com/wbem/wsman/1/wsmanfault"><s:Body><s:Fault><s:Code><s:Value>s:Receiver</s:Value><s:Subcode><s:Value>w:TimedOut</s:Value></s:Subcode></s:Code><s:Reason><s:Text xml:lang="">The WS-Management service cannot complete the operation within the time specified in OperationTimeout.  </s:Text></s:Reason><s:Detail><f:WSManFault Code="2150858793" Machine="host"><f:Message>Operation timed out.</f:Message></f:WSManFault></s:Detail></s:Fault></s:Body></s:Envelope>"#;
        let fault = parse_fault(body).unwrap();
        assert_eq!(fault.code, FAULT_TIMED_OUT);
        assert_eq!(fault.reason, "Operation timed out.");

        let bare = r#"<s:Envelope xmlns:s="x"><s:Body><s:Fault><s:Code><s:Value>s:Sender</s:Value><s:Subcode><s:Value>w:AccessDenied</s:Value></s:Subcode></s:Code><s:Reason><s:Text>Access is denied.</s:Text></s:Reason></s:Fault></s:Body></s:Envelope>"#;
        let fault = parse_fault(bare).unwrap();
        assert_eq!(fault.code, "w:AccessDenied");
        assert_eq!(fault.reason, "Access is denied.");

        assert_eq!(parse_fault("<html>Bad gateway</html>"), None);
        assert_eq!(parse_fault("not xml <"), None);
    }
}
