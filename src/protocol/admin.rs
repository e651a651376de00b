//! The admin API tail: CreateTopics, DeleteTopics, DeleteRecords,
//! DescribeGroups, ListGroups, DeleteGroups, DescribeConfigs, AlterConfigs,
//! IncrementalAlterConfigs, CreateAcls, DescribeAcls, DeleteAcls,
//! DescribeClientQuotas, AlterClientQuotas, DescribeClusters,
//! DescribeQuorum, DescribeTopicPartitions, ConsumerGroupHeartbeat,
//! ListTransactions, UnregisterBroker, UpdateFeatures,
//! AlterPartitionReassignments, OffsetForLeaderEpoch, and the transaction
//! coordinator calls (AddPartitionsToTxn/AddOffsetsToTxn/EndTxn/
//! TxnOffsetCommit).
//!
//! Each of these is a thin, low-traffic call from this crate's point of
//! view — the caller builds the body once with `AdminRequest::body_writer`
//! and reads the reply back as a tagged-fields-stripped byte slice rather
//! than a bespoke struct per call, the same way full request/response
//! types are reserved for the hot paths (`produce`, `fetch`) and
//! leaves everything else behind a single dispatch. `Encodable` still
//! backs the wire framing so this goes through the same connection path
//! as every other request.

use bytes::{ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::{skip_tagged_fields, ApiKeys, Encodable, RequestHeader, ResponseHeader};

/// A pre-encoded admin request body, written by the caller with
/// `protocol::header::WriteExt` before handing it to the connection layer.
#[derive(Clone, Debug, PartialEq)]
pub struct AdminRequest<'a> {
    pub header: RequestHeader<'a>,
    pub body: BytesMut,
}

impl<'a> AdminRequest<'a> {
    pub fn new(api_key: ApiKeys, api_version: i16, correlation_id: i32, client_id: Option<String>, body: BytesMut) -> Self {
        AdminRequest {
            header: RequestHeader {
                api_key: api_key as i16,
                api_version,
                correlation_id,
                client_id: client_id.map(::std::borrow::Cow::Owned),
                flexible: true,
            },
            body,
        }
    }
}

impl<'a> Encodable for AdminRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.extend_from_slice(&self.body);
        Ok(())
    }
}

/// An admin response with the header parsed and the flexible tagged-fields
/// tail stripped; the caller decodes `body` per the specific API's reply
/// schema (these replies vary widely in shape and are each a handful of
/// fields, not worth a struct per call site).
#[derive(Clone, Debug, PartialEq)]
pub struct AdminResponse<'a> {
    pub header: ResponseHeader,
    pub body: &'a [u8],
}

pub fn parse_admin_response(input: &[u8]) -> Result<AdminResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let rest = skip_tagged_fields(rest)?;
    Ok(AdminResponse { header, body: rest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BigEndian, BufMut};

    #[test]
    fn encode_admin_request_carries_prebuilt_body() {
        let mut body = BytesMut::with_capacity(16);
        body.put_i32::<BigEndian>(7);
        let req = AdminRequest::new(ApiKeys::CreateTopics, 7, 1, Some("c".to_owned()), body);
        let mut buf = BytesMut::with_capacity(32);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(buf.len() > 4);
    }
}
