//! DNS message representation.
//!
//! A DNS message consists of a header, question section, and three
//! resource record sections (answer, authority, additional). The OPT
//! pseudo-record is lifted out of the additional section on parse and
//! exposed as [`Edns`]; it is written back as the last additional record.

use crate::edns::Edns;
use crate::error::{Error, Result};
use crate::header::{Header, HeaderFlags, SectionCounts, HEADER_SIZE};
use crate::name::CompressionTable;
use crate::opcode::OpCode;
use crate::question::Question;
use crate::rcode::ResponseCode;
use crate::record::{RecordParser, ResourceRecord};
use crate::rtype::RecordType;
use crate::{MAX_STREAM_MESSAGE_SIZE, MAX_UDP_MESSAGE_SIZE};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete DNS message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    /// Additional records, excluding OPT.
    additional: Vec<ResourceRecord>,
    edns: Option<Edns>,
}

impl Message {
    /// Creates a new empty message with the given header.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    /// Creates a recursive query with a random transaction id.
    pub fn query(question: Question) -> Self {
        let mut header = Header::new(rand::random());
        header.set(HeaderFlags::RD, true);
        Self {
            header,
            questions: vec![question],
            ..Self::default()
        }
    }

    /// Builds an empty response to this message.
    ///
    /// Copies the transaction id, opcode, RD, CD, the question list and the
    /// EDNS version, payload size and DO flag; sets QR.
    pub fn create_response_instance(&self) -> Self {
        let mut header = Header::new(self.header.id);
        header.opcode = self.header.opcode;
        header.set(HeaderFlags::QR, true);
        header.set(HeaderFlags::RD, self.recursion_desired());
        header.set(HeaderFlags::CD, self.checking_disabled());

        let edns = self.edns.as_ref().map(|query_edns| {
            let mut edns = Edns::new();
            edns.set_version(query_edns.version());
            edns.set_udp_size(query_edns.udp_size());
            edns.set_dnssec_ok(query_edns.dnssec_ok());
            edns
        });

        Self {
            header,
            questions: self.questions.clone(),
            edns,
            ..Self::default()
        }
    }

    /// Builds a SERVFAIL response to this message.
    pub fn create_failure_response(&self) -> Self {
        let mut response = self.create_response_instance();
        response.header.rcode_bits = ResponseCode::ServFail.header_bits();
        response
    }

    // =========================================================================
    // Header accessors
    // =========================================================================

    /// Returns the message header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the transaction id.
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Sets the transaction id.
    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.header.id = id;
    }

    /// Returns the opcode.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        self.header.opcode
    }

    /// Sets the opcode.
    #[inline]
    pub fn set_opcode(&mut self, opcode: OpCode) {
        self.header.opcode = opcode;
    }

    /// Returns the full response code, including the EDNS extension.
    pub fn rcode(&self) -> ResponseCode {
        let extended = self.edns.as_ref().map_or(0, Edns::extended_rcode);
        ResponseCode::from_parts(self.header.rcode_bits, extended)
    }

    /// Sets the response code. Codes above 15 need EDNS.
    pub fn set_rcode(&mut self, rcode: ResponseCode) -> Result<()> {
        match self.edns.as_mut() {
            Some(edns) => edns.set_extended_rcode(rcode.extended_bits()),
            None if rcode.is_extended() => {
                return Err(Error::EdnsRequired {
                    flag: "extended RCODE",
                })
            }
            None => {}
        }
        self.header.rcode_bits = rcode.header_bits();
        Ok(())
    }

    /// Returns true if this is a query (QR clear).
    #[inline]
    pub fn is_query(&self) -> bool {
        !self.header.has(HeaderFlags::QR)
    }

    /// Returns true if this is a response (QR set).
    #[inline]
    pub fn is_response(&self) -> bool {
        self.header.has(HeaderFlags::QR)
    }

    /// Sets or clears QR.
    #[inline]
    pub fn set_response(&mut self, value: bool) {
        self.header.set(HeaderFlags::QR, value);
    }

    /// Returns true if the AA flag is set.
    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.header.has(HeaderFlags::AA)
    }

    /// Sets or clears AA.
    #[inline]
    pub fn set_authoritative(&mut self, value: bool) {
        self.header.set(HeaderFlags::AA, value);
    }

    /// Returns true if the TC flag is set.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.header.has(HeaderFlags::TC)
    }

    /// Sets or clears TC.
    #[inline]
    pub fn set_truncated(&mut self, value: bool) {
        self.header.set(HeaderFlags::TC, value);
    }

    /// Returns true if the RD flag is set.
    #[inline]
    pub fn recursion_desired(&self) -> bool {
        self.header.has(HeaderFlags::RD)
    }

    /// Sets or clears RD.
    #[inline]
    pub fn set_recursion_desired(&mut self, value: bool) {
        self.header.set(HeaderFlags::RD, value);
    }

    /// Returns true if the RA flag is set.
    #[inline]
    pub fn recursion_available(&self) -> bool {
        self.header.has(HeaderFlags::RA)
    }

    /// Sets or clears RA.
    #[inline]
    pub fn set_recursion_available(&mut self, value: bool) {
        self.header.set(HeaderFlags::RA, value);
    }

    /// Returns true if the AD flag is set.
    #[inline]
    pub fn is_authentic_data(&self) -> bool {
        self.header.has(HeaderFlags::AD)
    }

    /// Sets or clears AD.
    #[inline]
    pub fn set_authentic_data(&mut self, value: bool) {
        self.header.set(HeaderFlags::AD, value);
    }

    /// Returns true if the CD flag is set.
    #[inline]
    pub fn checking_disabled(&self) -> bool {
        self.header.has(HeaderFlags::CD)
    }

    /// Sets or clears CD.
    #[inline]
    pub fn set_checking_disabled(&mut self, value: bool) {
        self.header.set(HeaderFlags::CD, value);
    }

    // =========================================================================
    // EDNS
    // =========================================================================

    /// Returns the EDNS state, if the message carries an OPT record.
    #[inline]
    pub fn edns(&self) -> Option<&Edns> {
        self.edns.as_ref()
    }

    /// Returns mutable EDNS state.
    #[inline]
    pub fn edns_mut(&mut self) -> Option<&mut Edns> {
        self.edns.as_mut()
    }

    /// Enables or removes EDNS.
    pub fn set_edns(&mut self, edns: Option<Edns>) {
        self.edns = edns;
    }

    /// Returns true if EDNS is present and the DO flag is set.
    #[inline]
    pub fn dnssec_ok(&self) -> bool {
        self.edns.as_ref().is_some_and(Edns::dnssec_ok)
    }

    /// Sets the DO flag.
    ///
    /// Clearing it is always allowed; setting it requires EDNS.
    pub fn set_dnssec_ok(&mut self, value: bool) -> Result<()> {
        match self.edns.as_mut() {
            Some(edns) => edns.set_dnssec_ok(value),
            None if value => return Err(Error::EdnsRequired { flag: "DO" }),
            None => {}
        }
        Ok(())
    }

    /// Largest response the sender accepts over UDP.
    pub fn max_udp_payload_size(&self) -> usize {
        self.edns.as_ref().map_or(MAX_UDP_MESSAGE_SIZE, |edns| {
            (edns.udp_size() as usize).max(MAX_UDP_MESSAGE_SIZE)
        })
    }

    // =========================================================================
    // Sections
    // =========================================================================

    /// Returns the question section.
    #[inline]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the first question.
    #[inline]
    pub fn question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Returns the answer section.
    #[inline]
    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    /// Returns the authority section.
    #[inline]
    pub fn authority(&self) -> &[ResourceRecord] {
        &self.authority
    }

    /// Returns the additional section without the OPT record.
    #[inline]
    pub fn additional(&self) -> &[ResourceRecord] {
        &self.additional
    }

    /// Adds a question.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Adds an answer record.
    pub fn add_answer(&mut self, record: ResourceRecord) {
        self.answers.push(record);
    }

    /// Adds multiple answer records.
    pub fn add_answers(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.answers.extend(records);
    }

    /// Adds an authority record.
    pub fn add_authority(&mut self, record: ResourceRecord) {
        self.authority.push(record);
    }

    /// Adds an additional record.
    ///
    /// OPT records belong in [`Message::set_edns`] instead.
    pub fn add_additional(&mut self, record: ResourceRecord) {
        self.additional.push(record);
    }

    /// Removes and returns the answer section.
    pub fn take_answers(&mut self) -> Vec<ResourceRecord> {
        std::mem::take(&mut self.answers)
    }

    // =========================================================================
    // Transport hints
    // =========================================================================

    /// Returns true if the query must go over a connection-oriented
    /// transport: zone transfers, ANY and SMIMEA.
    pub fn is_reliable_sending_requested(&self) -> bool {
        self.question().and_then(|q| q.qtype.as_known()).is_some_and(|t| {
            matches!(
                t,
                RecordType::AXFR | RecordType::IXFR | RecordType::ANY | RecordType::SMIMEA
            )
        })
    }

    /// Returns true if the response was truncated and the query should be
    /// sent again over a connection-oriented transport.
    #[inline]
    pub fn is_reliable_resending_requested(&self) -> bool {
        self.is_truncated()
    }

    /// Returns true if this zone-transfer response is followed by more
    /// messages.
    ///
    /// A transfer opens with the zone's SOA and closes with it again. The
    /// first message is incomplete when it starts with an SOA, carries
    /// more than that one record and does not end with an SOA. A lone SOA
    /// answers an IXFR whose client is already current (RFC 1995 section 4).
    /// Every later message is incomplete unless its last answer is an SOA.
    pub fn is_next_message_waiting(&self, is_subsequent_response: bool) -> bool {
        let last_is_soa = self.answers.last().is_some_and(|r| r.is(RecordType::SOA));

        if is_subsequent_response {
            return !self.answers.is_empty() && !last_is_soa;
        }

        let is_transfer = self
            .question()
            .is_some_and(|q| q.is_zone_transfer());
        is_transfer
            && self.answers.first().is_some_and(|r| r.is(RecordType::SOA))
            && self.answers.len() > 1
            && !last_is_soa
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    /// Parses a DNS message from wire format.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (mut header, counts) = Header::parse(data)?;

        let mut offset = HEADER_SIZE;
        let mut questions = Vec::with_capacity(counts.questions.min(16) as usize);
        for _ in 0..counts.questions {
            let (question, consumed) = Question::parse(data, offset)?;
            questions.push(question);
            offset += consumed;
        }

        let mut parser = RecordParser::new(data, offset, counts.answers);
        let answers = collect_section(&mut parser)?;
        let mut parser = RecordParser::new(data, parser.offset(), counts.authority);
        let authority = collect_section(&mut parser)?;

        let mut parser = RecordParser::new(data, parser.offset(), counts.additional);
        let mut additional = Vec::new();
        let mut edns = None;
        while let Some(record) = parser.next()? {
            if record.is(RecordType::OPT) {
                if edns.is_some() {
                    return Err(Error::MultipleOptRecords);
                }
                edns = Some(Edns::from_record(&record)?);
            } else {
                additional.push(record);
            }
        }

        // keep only the low bits in the header; rcode() recombines
        header.rcode_bits &= 0x0F;

        Ok(Self {
            header,
            questions,
            answers,
            authority,
            additional,
            edns,
        })
    }

    /// Uncompressed size of the message, an upper bound on what
    /// [`Message::encode`] writes.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE
            + self.questions.iter().map(Question::max_encoded_len).sum::<usize>()
            + self
                .records()
                .map(ResourceRecord::max_encoded_len)
                .sum::<usize>()
            + self.edns.as_ref().map_or(0, Edns::wire_len)
    }

    /// Encodes the message.
    ///
    /// Section counts are taken from the section lengths. Names are
    /// compressed against a table scoped to this call; in canonical mode
    /// nothing is compressed and names are lowercased.
    pub fn encode(&self, canonical: bool) -> Result<Bytes> {
        let additional = self.additional.len() + usize::from(self.edns.is_some());
        let counts = SectionCounts {
            questions: section_count(self.questions.len())?,
            answers: section_count(self.answers.len())?,
            authority: section_count(self.authority.len())?,
            additional: section_count(additional)?,
        };

        let mut buf = BytesMut::with_capacity(self.wire_len());
        let mut table = CompressionTable::new();
        let mut compression = (!canonical).then_some(&mut table);

        self.header.write_to(&mut buf, counts);
        for question in &self.questions {
            question.encode(&mut buf, compression.as_deref_mut(), canonical);
        }
        for record in self.records() {
            record.encode(&mut buf, compression.as_deref_mut(), canonical)?;
        }
        if let Some(edns) = &self.edns {
            edns.to_record().encode(&mut buf, None, canonical)?;
        }

        if buf.len() > MAX_STREAM_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge {
                size: buf.len(),
                max_size: MAX_STREAM_MESSAGE_SIZE,
            });
        }
        Ok(buf.freeze())
    }

    /// Encodes the message with name compression.
    #[inline]
    pub fn to_wire(&self) -> Result<Bytes> {
        self.encode(false)
    }

    fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answers
            .iter()
            .chain(&self.authority)
            .chain(&self.additional)
    }
}

fn collect_section(parser: &mut RecordParser<'_>) -> Result<Vec<ResourceRecord>> {
    let mut records = Vec::new();
    while let Some(record) = parser.next()? {
        records.push(record);
    }
    Ok(records)
}

fn section_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::MessageTooLarge {
        size: len,
        max_size: u16::MAX as usize,
    })
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            ";; ->>HEADER<<- opcode: {}, status: {}, id: {}",
            self.opcode(),
            self.rcode(),
            self.id()
        )?;

        f.write_str(";; flags:")?;
        for (flag, label) in [
            (HeaderFlags::QR, "qr"),
            (HeaderFlags::AA, "aa"),
            (HeaderFlags::TC, "tc"),
            (HeaderFlags::RD, "rd"),
            (HeaderFlags::RA, "ra"),
            (HeaderFlags::AD, "ad"),
            (HeaderFlags::CD, "cd"),
        ] {
            if self.header.has(flag) {
                write!(f, " {label}")?;
            }
        }
        writeln!(
            f,
            "; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.questions.len(),
            self.answers.len(),
            self.authority.len(),
            self.additional.len() + usize::from(self.edns.is_some())
        )?;

        if let Some(edns) = &self.edns {
            writeln!(f, "\n;; OPT PSEUDOSECTION:\n; {edns}")?;
        }

        writeln!(f, "\n;; QUESTION SECTION:")?;
        for q in &self.questions {
            writeln!(f, ";{q}")?;
        }

        for (title, section) in [
            ("ANSWER", &self.answers),
            ("AUTHORITY", &self.authority),
            ("ADDITIONAL", &self.additional),
        ] {
            if !section.is_empty() {
                writeln!(f, "\n;; {title} SECTION:")?;
                for r in section {
                    writeln!(f, "{r}")?;
                }
            }
        }

        Ok(())
    }
}
