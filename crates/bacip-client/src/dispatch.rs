//! Per-datagram decoding and routing.

use crate::tsm::{Reply, Tsm};
use crate::utsm::Manager;
use crate::{ClientError, DiscoveredDevice};
use bacip_core::apdu::{Apdu, ComplexAckHeader, ConfirmedRequestHeader, SimpleAck};
use bacip_core::encoding::reader::Reader;
use bacip_core::npdu::Npdu;
use bacip_core::services::i_am::{IAmRequest, SERVICE_I_AM};
use bacip_core::services::who_is::{WhoIsRequest, SERVICE_WHO_IS};
use bacip_datalink::bip::bvlc::{BvlcFrame, BvlcFunction};
use bacip_datalink::{BacnetAddress, DataLinkAddress};

/// What happened to one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Reply handed to the request waiting on this invoke id.
    Transaction(u8),
    /// I-Am published for this device instance.
    Discovery(u32),
    /// Another station's Who-Is. Not answered.
    WhoIs {
        low: Option<u32>,
        high: Option<u32>,
    },
    Ignored(&'static str),
}

/// Decodes BVLC, NPDU and APDU and routes the result to the transaction
/// pool or the discovery subscribers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tsm: Tsm,
    discovery: Manager<DiscoveredDevice>,
}

impl Dispatcher {
    pub fn new(tsm: Tsm, discovery: Manager<DiscoveredDevice>) -> Self {
        Self { tsm, discovery }
    }

    pub fn dispatch(&self, source: DataLinkAddress, datagram: &[u8]) -> Result<Routed, ClientError> {
        let frame = BvlcFrame::decode(datagram)?;
        match frame.header.function {
            BvlcFunction::OriginalUnicastNpdu | BvlcFunction::OriginalBroadcastNpdu => {}
            BvlcFunction::ForwardedNpdu => {
                if let Some(origin) = frame.origin {
                    log::debug!("forwarded npdu from {origin} via {source}");
                }
            }
            other => {
                log::debug!("ignoring bvlc function {other:?} from {source}");
                return Ok(Routed::Ignored("bvlc function"));
            }
        }

        let mut r = Reader::new(frame.payload);
        let npdu = Npdu::decode(&mut r)?;
        if npdu.is_network_message() {
            log::debug!(
                "ignoring network layer message {:?} from {source}",
                npdu.message_type
            );
            return Ok(Routed::Ignored("network layer message"));
        }

        // The waiting request decodes the raw reply itself.
        let snapshot = r.rest();
        let apdu = Apdu::decode(&mut Reader::new(snapshot))?;

        match apdu {
            Apdu::UnconfirmedRequest { header, payload } => match header.service_choice {
                SERVICE_I_AM => {
                    let i_am = IAmRequest::decode_after_header(&mut Reader::new(payload))?;
                    let address = BacnetAddress {
                        mac: Some(source),
                        remote: npdu.source,
                    };
                    let device = DiscoveredDevice::from_i_am(address, &i_am);
                    let instance = device.instance();
                    let delivered = self.discovery.publish(instance, device);
                    log::trace!("i-am from device {instance} at {address} reached {delivered} subscribers");
                    Ok(Routed::Discovery(instance))
                }
                SERVICE_WHO_IS => {
                    let who_is = WhoIsRequest::decode_after_header(&mut Reader::new(payload))?;
                    log::debug!(
                        "who-is from {source} for {:?}..{:?}",
                        who_is.low_limit,
                        who_is.high_limit
                    );
                    Ok(Routed::WhoIs {
                        low: who_is.low_limit,
                        high: who_is.high_limit,
                    })
                }
                other => {
                    log::debug!("dropping unconfirmed service {other} from {source}");
                    Ok(Routed::Ignored("unconfirmed service"))
                }
            },
            Apdu::SimpleAck(SimpleAck { invoke_id, .. })
            | Apdu::ComplexAck {
                header: ComplexAckHeader { invoke_id, .. },
                ..
            }
            | Apdu::ConfirmedRequest {
                header: ConfirmedRequestHeader { invoke_id, .. },
                ..
            } => Ok(self.deliver(invoke_id, Ok(snapshot.to_vec()))),
            Apdu::Error(err) => Ok(self.deliver(err.invoke_id, Err(err.into()))),
            Apdu::SegmentAck(_) | Apdu::Reject(_) | Apdu::Abort(_) => {
                log::debug!(
                    "dropping {:?} for invoke id {:?} from {source}",
                    apdu.apdu_type(),
                    apdu.invoke_id()
                );
                Ok(Routed::Ignored("segment-ack, reject or abort"))
            }
        }
    }

    fn deliver(&self, invoke_id: u8, reply: Reply) -> Routed {
        match self.tsm.send(invoke_id, reply) {
            Ok(()) => Routed::Transaction(invoke_id),
            Err(err) => {
                log::debug!("late or unexpected reply: {err}");
                Routed::Ignored("no outstanding transaction")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, Routed};
    use crate::tsm::Tsm;
    use crate::utsm::{Manager, SubscriberConfig, SubscriberFilter};
    use crate::ClientError;
    use bacip_core::apdu::{BacnetError, ComplexAckHeader, ConfirmedRequestHeader, SimpleAck};
    use bacip_core::encoding::writer::Writer;
    use bacip_core::npdu::{Npdu, NpduAddress};
    use bacip_core::services::i_am::IAmRequest;
    use bacip_core::services::who_is::WhoIsRequest;
    use bacip_core::types::{ObjectId, ObjectType, Segmentation};
    use bacip_datalink::bip::bvlc::{encode_frame, BvlcFunction};
    use bacip_datalink::DataLinkAddress;
    use std::time::Duration;

    fn source() -> DataLinkAddress {
        DataLinkAddress::Ip(([192, 168, 23, 40], 47808).into())
    }

    fn dispatcher() -> (Dispatcher, Tsm, Manager<crate::DiscoveredDevice>) {
        let tsm = Tsm::new(4);
        let discovery = Manager::new(SubscriberConfig::default());
        (Dispatcher::new(tsm.clone(), discovery.clone()), tsm, discovery)
    }

    fn datagram(function: BvlcFunction, npdu: Npdu, apdu: &[u8]) -> Vec<u8> {
        let mut inner = [0u8; 256];
        let mut w = Writer::new(&mut inner);
        npdu.encode(&mut w).unwrap();
        w.write_all(apdu).unwrap();
        let body = w.as_written().to_vec();

        let mut out = [0u8; 300];
        let mut w = Writer::new(&mut out);
        encode_frame(&mut w, function, &body).unwrap();
        w.as_written().to_vec()
    }

    fn encode(f: impl FnOnce(&mut Writer<'_>)) -> Vec<u8> {
        let mut buf = [0u8; 128];
        let mut w = Writer::new(&mut buf);
        f(&mut w);
        w.as_written().to_vec()
    }

    #[tokio::test]
    async fn complex_ack_reaches_waiter_unmodified() {
        let (dispatcher, tsm, _) = dispatcher();
        let tx = tsm.allocate().unwrap();
        let id = tx.invoke_id();
        let apdu = encode(|w| {
            ComplexAckHeader::new(id, 0x0C).encode(w).unwrap();
            w.write_all(&[0x0C, 0x02, 0x00, 0x00, 0x01, 0x19, 0x4D]).unwrap();
        });

        let routed = dispatcher
            .dispatch(source(), &datagram(BvlcFunction::OriginalUnicastNpdu, Npdu::new(0), &apdu))
            .unwrap();
        assert_eq!(routed, Routed::Transaction(id));
        assert_eq!(tx.wait(Duration::from_secs(1)).await.unwrap(), apdu);
    }

    #[tokio::test]
    async fn error_pdu_becomes_remote_service_error() {
        let (dispatcher, tsm, _) = dispatcher();
        let tx = tsm.allocate().unwrap();
        let apdu = encode(|w| {
            BacnetError {
                invoke_id: tx.invoke_id(),
                service_choice: 0x0F,
                error_class: Some(2),
                error_code: Some(32),
            }
            .encode(w)
            .unwrap()
        });
        dispatcher
            .dispatch(source(), &datagram(BvlcFunction::OriginalUnicastNpdu, Npdu::new(0), &apdu))
            .unwrap();
        assert!(matches!(
            tx.wait(Duration::from_secs(1)).await,
            Err(ClientError::RemoteServiceError {
                service_choice: 0x0F,
                error_class_raw: Some(2),
                error_code_raw: Some(32),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn confirmed_replies_route_by_their_own_invoke_id() {
        let (dispatcher, tsm, _) = dispatcher();
        let first = tsm.allocate().unwrap();
        let _second = tsm.allocate().unwrap();
        let ack_tx = tsm.allocate().unwrap();
        let request_tx = tsm.allocate().unwrap();

        let ack = encode(|w| {
            SimpleAck {
                invoke_id: ack_tx.invoke_id(),
                service_choice: 0x0F,
            }
            .encode(w)
            .unwrap()
        });
        let request = encode(|w| {
            ConfirmedRequestHeader::new(request_tx.invoke_id(), 0x0C)
                .encode(w)
                .unwrap()
        });
        for (apdu, id) in [(&ack, ack_tx.invoke_id()), (&request, request_tx.invoke_id())] {
            let routed = dispatcher
                .dispatch(source(), &datagram(BvlcFunction::OriginalUnicastNpdu, Npdu::new(0), apdu))
                .unwrap();
            assert_eq!(routed, Routed::Transaction(id));
        }

        assert_eq!(ack_tx.wait(Duration::from_secs(1)).await.unwrap(), ack);
        assert_eq!(request_tx.wait(Duration::from_secs(1)).await.unwrap(), request);
        assert!(matches!(
            first.wait(Duration::from_millis(10)).await,
            Err(ClientError::Timeout)
        ));
    }

    #[test]
    fn reply_without_transaction_is_ignored() {
        let (dispatcher, _, _) = dispatcher();
        let apdu = encode(|w| {
            SimpleAck {
                invoke_id: 3,
                service_choice: 0x0F,
            }
            .encode(w)
            .unwrap()
        });
        let routed = dispatcher
            .dispatch(source(), &datagram(BvlcFunction::OriginalUnicastNpdu, Npdu::new(0), &apdu))
            .unwrap();
        assert!(matches!(routed, Routed::Ignored(_)));
    }

    #[tokio::test]
    async fn routed_i_am_keeps_network_source() {
        let (dispatcher, _, discovery) = dispatcher();
        let mut sub = discovery.subscribe(SubscriberFilter::Key(2428));
        let apdu = encode(|w| {
            IAmRequest {
                device_id: ObjectId::new(ObjectType::Device, 2428),
                max_apdu: 480,
                segmentation: Segmentation::NoSegmentation,
                vendor_id: 15,
            }
            .encode(w)
            .unwrap()
        });
        let mut npdu = Npdu::new(0);
        npdu.source = Some(NpduAddress::station(5, &[0x1D]));

        let routed = dispatcher
            .dispatch(source(), &datagram(BvlcFunction::OriginalBroadcastNpdu, npdu, &apdu))
            .unwrap();
        assert_eq!(routed, Routed::Discovery(2428));

        let device = sub.recv().await.unwrap();
        assert_eq!(device.instance(), 2428);
        assert_eq!(device.max_apdu, 480);
        assert_eq!(device.vendor_id, 15);
        assert_eq!(device.address.mac, Some(source()));
        assert_eq!(device.address.remote, Some(NpduAddress::station(5, &[0x1D])));
    }

    #[test]
    fn who_is_is_decoded_not_answered() {
        let (dispatcher, _, _) = dispatcher();
        let apdu = encode(|w| WhoIsRequest::range(10, 20).encode(w).unwrap());
        let routed = dispatcher
            .dispatch(source(), &datagram(BvlcFunction::OriginalBroadcastNpdu, Npdu::new(0), &apdu))
            .unwrap();
        assert_eq!(
            routed,
            Routed::WhoIs {
                low: Some(10),
                high: Some(20)
            }
        );
    }

    #[tokio::test]
    async fn forwarded_npdu_header_is_stripped() {
        let (dispatcher, tsm, _) = dispatcher();
        let tx = tsm.allocate().unwrap();
        let apdu = [0x20, tx.invoke_id(), 0x0F];

        let mut body = vec![10, 1, 2, 3, 0xBA, 0xC0];
        body.extend_from_slice(&[0x01, 0x00]);
        body.extend_from_slice(&apdu);
        let mut out = [0u8; 64];
        let mut w = Writer::new(&mut out);
        encode_frame(&mut w, BvlcFunction::ForwardedNpdu, &body).unwrap();

        let routed = dispatcher.dispatch(source(), w.as_written()).unwrap();
        assert_eq!(routed, Routed::Transaction(tx.invoke_id()));
        assert_eq!(tx.wait(Duration::from_secs(1)).await.unwrap(), apdu.to_vec());
    }

    #[test]
    fn network_messages_and_other_functions_are_ignored() {
        let (dispatcher, _, _) = dispatcher();
        let network = datagram(BvlcFunction::OriginalUnicastNpdu, Npdu::new(0x80), &[0x01, 0x00, 0x05]);
        assert_eq!(
            dispatcher.dispatch(source(), &network).unwrap(),
            Routed::Ignored("network layer message")
        );
        let result = [0x81, 0x00, 0x00, 0x06, 0x00, 0x00];
        assert_eq!(
            dispatcher.dispatch(source(), &result).unwrap(),
            Routed::Ignored("bvlc function")
        );
    }

    #[test]
    fn malformed_datagrams_fail_without_side_effects() {
        let (dispatcher, tsm, _) = dispatcher();
        let held = tsm.allocate().unwrap();
        for garbage in [
            &[][..],
            &[0x00, 0x01, 0x02],
            &[0x81, 0x0A, 0x00, 0x10, 0x01],
            &[0x81, 0x0A, 0x00, 0x05, 0x02],
            &[0x81, 0x0A, 0x00, 0x07, 0x01, 0x00, 0x90],
            &[0x81, 0x0A, 0x00, 0x07, 0x01, 0x00, 0x30],
        ] {
            assert!(dispatcher.dispatch(source(), garbage).is_err(), "{garbage:02x?}");
        }
        assert!(tsm.is_in_use(held.invoke_id()));
    }
}
