use dnsprobe_domain::DnsError;
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};

use crate::message::validate::equal_ascii_name;

/// Extracts the answer RRs that pertain to `question`, following the CNAME
/// chain from the question name to its terminal alias.
///
/// The walk is bounded by the number of CNAME RRs in the answer section, so
/// aliasing cycles terminate. Returns [`DnsError::NoData`] when nothing in
/// the answer section matches the terminal name, class and type.
pub fn valid_answers(question: &Query, response: &Message) -> Result<Vec<Record>, DnsError> {
    let answers = response.answers();
    let mut name = question.name().to_ascii();

    let cname_budget = answers
        .iter()
        .filter(|rr| rr.record_type() == RecordType::CNAME)
        .count();
    for _ in 0..cname_budget {
        let target = answers.iter().find_map(|rr| match rr.data() {
            RData::CNAME(target)
                if rr.dns_class() == DNSClass::IN
                    && equal_ascii_name(&rr.name().to_ascii(), &name) =>
            {
                Some(target.to_ascii())
            }
            _ => None,
        });
        match target {
            Some(next) => name = next,
            None => break,
        }
    }

    let pertinent: Vec<Record> = answers
        .iter()
        .filter(|rr| {
            rr.record_type() == question.query_type()
                && rr.dns_class() == question.query_class()
                && equal_ascii_name(&rr.name().to_ascii(), &name)
        })
        .cloned()
        .collect();

    if pertinent.is_empty() {
        return Err(DnsError::NoData);
    }
    Ok(pertinent)
}
