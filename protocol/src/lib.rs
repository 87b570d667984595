//! SOCKS5 wire format: method negotiation, username/password
//! sub-negotiation, requests/replies and UDP relay datagrams.

pub mod addr;
pub mod error;
pub mod message;
pub mod packet;

pub use addr::{AddrType, TargetAddr};
pub use message::{
    Command, Method, MethodReply, MethodRequest, PasswordReply, PasswordRequest, Reply,
    ReplyCode, Request, VERSION,
};
pub use packet::UdpPacket;

#[test]
fn proto_test() {
    let target = TargetAddr::Domain("resolver.example".into(), 53);
    let send_packet = UdpPacket::new(target.clone(), b"hello world".to_vec())
        .encode()
        .unwrap();
    let receive_packet = UdpPacket::decode(send_packet.as_slice()).unwrap();
    assert_eq!(receive_packet.target, target);
    assert_eq!(receive_packet.data, b"hello world");
}
