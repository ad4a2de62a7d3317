use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record};
use std::net::Ipv4Addr;

/// TTL of synthesized localhost answers, matching the template zone
/// `. 60 IN A 127.0.0.1`.
const LOCALHOST_TTL: u32 = 60;

/// The fixed record set answered for every subscribed domain.
///
/// Built once at startup. Each reply copies every template record and
/// rewrites the copy's owner name to the queried name; the template itself
/// is never mutated.
pub struct LocalAnswerTemplate {
    records: Vec<Record>,
}

impl LocalAnswerTemplate {
    pub fn new() -> Self {
        let record = Record::from_rdata(
            Name::root(),
            LOCALHOST_TTL,
            RData::A(A(Ipv4Addr::LOCALHOST)),
        );
        Self {
            records: vec![record],
        }
    }

    /// Build an authoritative reply to `query` answering with the template
    /// records renamed to the queried name.
    pub fn build_reply(&self, query: &Message) -> Message {
        let mut reply = Message::new();
        reply
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_authoritative(true)
            .set_recursion_desired(query.recursion_desired())
            .set_recursion_available(true)
            .set_response_code(ResponseCode::NoError);

        for question in query.queries() {
            reply.add_query(question.clone());
        }

        if let Some(question) = query.queries().first() {
            let qname = question.name().clone();
            for template in &self.records {
                let mut answer = template.clone();
                answer.set_name(qname.clone());
                reply.add_answer(answer);
            }
        }

        reply
    }
}

impl Default for LocalAnswerTemplate {
    fn default() -> Self {
        Self::new()
    }
}
