// Parse, serialize and parse again: the second pass must see the same message

use proptest::prelude::*;
use sigcore_sip_core::prelude::*;

fn render(eol: &str, fold: bool, call_id: &str, branch: &str, cseq: u32, body: &[u8]) -> Vec<u8> {
    let sep = if fold { format!("{eol} ") } else { " ".to_string() };
    let mut text = format!(
        "MESSAGE sip:bob@192.0.2.4 SIP/2.0{eol}\
         Via: SIP/2.0/UDP{sep}192.0.2.1:5070;branch=z9hG4bK{branch};rport{eol}\
         Max-Forwards: 70{eol}\
         To: <sip:bob@192.0.2.4>{eol}\
         From: \"Alice\" <sip:alice@192.0.2.1>;tag=a{branch}{eol}\
         Call-ID: {call_id}{eol}\
         CSeq: {cseq}{sep}MESSAGE{eol}\
         Content-Type: text/plain{eol}\
         Content-Length: {}{eol}{eol}",
        body.len()
    )
    .into_bytes();
    text.extend_from_slice(body);
    text
}

proptest! {
    #[test]
    fn reparse_is_stable(
        crlf in any::<bool>(),
        fold in any::<bool>(),
        call_id in "[a-zA-Z0-9]{1,16}@[a-z]{1,8}\\.com",
        branch in "[a-zA-Z0-9]{1,12}",
        cseq in any::<u32>(),
        body in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let eol = if crlf { "\r\n" } else { "\n" };
        let first = Message::parse(render(eol, fold, &call_id, &branch, cseq, &body)).unwrap();
        let wire = first.to_bytes();
        let second = Message::parse(wire.clone()).unwrap();

        prop_assert_eq!(second.to_bytes(), wire);
        prop_assert_eq!(&second.call_id, &first.call_id);
        prop_assert_eq!(second.cseq.num, cseq);
        prop_assert_eq!(&second.via1.branch, &first.via1.branch);
        prop_assert_eq!(second.via1.port, Some(5070));
        prop_assert!(second.via1.rport.is_some());
        prop_assert_eq!(second.from.tag_str(), first.from.tag_str());
        prop_assert_eq!(&second.body[..], &body[..]);

        let names: Vec<&str> = first.headers.iter().map(|h| h.name.as_str()).collect();
        let renames: Vec<&str> = second.headers.iter().map(|h| h.name.as_str()).collect();
        prop_assert_eq!(names, renames);
    }
}

#[test]
fn test_folds_collapse_to_one_space() {
    let msg = Message::parse(
        "OPTIONS sip:a@192.0.2.1 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.0.2.2;branch=z9hG4bKf\r\n\
         To: <sip:a@192.0.2.1>\r\n\
         From: <sip:b@192.0.2.2>;tag=1\r\n\
         Call-ID: f\r\n\
         CSeq: 1 OPTIONS\r\n\
         Subject: I know you're there,\r\n   \tpick up the phone\r\n\r\n",
    )
    .unwrap();

    let wire = msg.to_bytes();
    let text = std::str::from_utf8(&wire).unwrap();
    assert!(text.contains("Subject: I know you're there, pick up the phone\r\n"));
    assert!(text.ends_with("\r\n\r\n"));
}
