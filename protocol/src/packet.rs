use crate::addr::TargetAddr;
use crate::error::{self, Error, ensure_len};

/// A datagram exchanged with the UDP relay:
/// `RSV(2) FRAG(1) ATYP DST.ADDR DST.PORT DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    pub frag: u8,
    pub target: TargetAddr,
    pub data: Vec<u8>,
}

impl UdpPacket {
    pub fn new(target: TargetAddr, data: Vec<u8>) -> Self {
        Self {
            frag: 0,
            target,
            data,
        }
    }

    pub fn header_len(target: &TargetAddr) -> usize {
        3 + target.encoded_len()
    }

    pub fn encode(&self) -> error::Result<Vec<u8>> {
        encode_datagram(self.frag, &self.target, &self.data)
    }

    pub fn decode(data: &[u8]) -> error::Result<Self> {
        let (frag, target, offset) = decode_header(data)?;
        Ok(Self {
            frag,
            target,
            data: data[offset..].to_vec(),
        })
    }
}

/// Builds a datagram without taking ownership of the payload.
pub fn encode_datagram(frag: u8, target: &TargetAddr, payload: &[u8]) -> error::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(UdpPacket::header_len(target) + payload.len());
    buf.extend_from_slice(&[0x00, 0x00, frag]);
    target.encode_into(&mut buf)?;
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Parses the header, returning `(frag, target, payload offset)`.
pub fn decode_header(data: &[u8]) -> error::Result<(u8, TargetAddr, usize)> {
    ensure_len(data, 4)?;
    let rsv = u16::from_be_bytes([data[0], data[1]]);
    if rsv != 0 {
        return Err(Error::Reserved(rsv));
    }
    let (target, used) = TargetAddr::decode(&data[3..])?;
    Ok((data[2], target, 3 + used))
}

#[test]
fn packet_layout() {
    let packet = UdpPacket::new(
        TargetAddr::Ip("1.1.1.1:53".parse().unwrap()),
        b"ping".to_vec(),
    );
    let encoded = packet.encode().unwrap();
    assert_eq!(
        encoded,
        vec![0, 0, 0, 0x01, 1, 1, 1, 1, 0, 53, b'p', b'i', b'n', b'g']
    );
    assert_eq!(UdpPacket::decode(&encoded).unwrap(), packet);
}

#[test]
fn packet_keeps_fragment_number() {
    let mut raw = vec![0, 0, 3];
    raw.extend_from_slice(&[0x03, 4, b'h', b'o', b's', b't', 0, 80]);
    raw.extend_from_slice(b"x");
    let packet = UdpPacket::decode(&raw).unwrap();
    assert_eq!(packet.frag, 3);
    assert_eq!(packet.target, TargetAddr::Domain("host".into(), 80));
    assert_eq!(packet.data, b"x");
}

#[test]
fn packet_rejects_reserved_bits() {
    let raw = [0, 1, 0, 0x01, 1, 1, 1, 1, 0, 53];
    assert_eq!(UdpPacket::decode(&raw), Err(Error::Reserved(1)));
}
