#![allow(dead_code)]

use bacip_client::{BacnetClient, ClientConfig};
use bacip_core::apdu::Apdu;
use bacip_core::encoding::{reader::Reader, writer::Writer};
use bacip_core::npdu::Npdu;
use bacip_core::services::i_am::IAmRequest;
use bacip_core::types::{ObjectId, ObjectType, Segmentation};
use bacip_datalink::bip::bvlc::{encode_frame, BvlcFrame, BvlcFunction};
use bacip_datalink::{BacnetAddress, DataLink, DataLinkAddress, DataLinkError};
use tokio::sync::{mpsc, watch, Mutex};

/// One frame handed to the data link by the client.
#[derive(Debug)]
pub struct Sent {
    pub frame: Vec<u8>,
    pub npdu: Npdu,
    pub destination: BacnetAddress,
}

/// Channel-backed data link: the test plays the network through [`Peer`].
#[derive(Debug)]
pub struct MockDataLink {
    inbound: Mutex<mpsc::UnboundedReceiver<(Vec<u8>, DataLinkAddress)>>,
    outbound: mpsc::UnboundedSender<Sent>,
    shutdown: watch::Sender<bool>,
}

/// The network side of a [`MockDataLink`].
#[derive(Debug)]
pub struct Peer {
    pub inbound: mpsc::UnboundedSender<(Vec<u8>, DataLinkAddress)>,
    pub outbound: mpsc::UnboundedReceiver<Sent>,
}

impl Peer {
    pub async fn next_request(&mut self) -> (Sent, Request) {
        let sent = self.outbound.recv().await.expect("client stopped sending");
        let request = Request::decode(&sent.frame);
        (sent, request)
    }

    pub fn reply(&self, from: DataLinkAddress, datagram: Vec<u8>) {
        self.inbound.send((datagram, from)).expect("client receiver gone");
    }
}

pub fn mock() -> (MockDataLink, Peer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (shutdown, _) = watch::channel(false);
    (
        MockDataLink {
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
            shutdown,
        },
        Peer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        },
    )
}

pub fn client(config: ClientConfig) -> (BacnetClient<MockDataLink>, Peer) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (datalink, peer) = mock();
    (BacnetClient::with_config(datalink, config), peer)
}

impl DataLink for MockDataLink {
    async fn send(
        &self,
        frame: &[u8],
        npdu: &Npdu,
        destination: &BacnetAddress,
    ) -> Result<usize, DataLinkError> {
        if *self.shutdown.borrow() {
            return Err(DataLinkError::Closed);
        }
        self.outbound
            .send(Sent {
                frame: frame.to_vec(),
                npdu: *npdu,
                destination: *destination,
            })
            .map_err(|_| DataLinkError::Closed)?;
        Ok(frame.len())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
        let mut shutdown = self.shutdown.subscribe();
        let closed = *shutdown.borrow_and_update();
        if closed {
            return Err(DataLinkError::Closed);
        }
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            next = inbound.recv() => {
                let (datagram, source) = next.ok_or(DataLinkError::Closed)?;
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok((n, source))
            }
            _ = shutdown.changed() => Err(DataLinkError::Closed),
        }
    }

    fn close(&self) -> Result<(), DataLinkError> {
        self.shutdown.send_replace(true);
        Ok(())
    }
}

/// A frame the client sent, split into its layers.
#[derive(Debug)]
pub struct Request {
    pub function: BvlcFunction,
    pub length: u16,
    pub npdu: Npdu,
    pub apdu: Vec<u8>,
}

impl Request {
    pub fn decode(frame: &[u8]) -> Self {
        let bvlc = BvlcFrame::decode(frame).unwrap();
        let mut r = Reader::new(bvlc.payload);
        let npdu = Npdu::decode(&mut r).unwrap();
        Self {
            function: bvlc.header.function,
            length: bvlc.header.length,
            npdu,
            apdu: r.rest().to_vec(),
        }
    }

    pub fn apdu(&self) -> Apdu<'_> {
        Apdu::decode(&mut Reader::new(&self.apdu)).unwrap()
    }

    pub fn invoke_id(&self) -> u8 {
        self.apdu().invoke_id().expect("not a confirmed request")
    }
}

pub fn device(host: u8) -> DataLinkAddress {
    DataLinkAddress::Ip(([192, 168, 23, host], 47808).into())
}

pub fn apdu(encode: impl FnOnce(&mut Writer<'_>)) -> Vec<u8> {
    let mut buf = [0u8; 512];
    let mut w = Writer::new(&mut buf);
    encode(&mut w);
    w.as_written().to_vec()
}

fn datagram(function: BvlcFunction, npdu: Npdu, apdu: &[u8]) -> Vec<u8> {
    let body = self::apdu(|w| {
        npdu.encode(w).unwrap();
        w.write_all(apdu).unwrap();
    });
    let mut out = vec![0u8; body.len() + 4];
    let mut w = Writer::new(&mut out);
    encode_frame(&mut w, function, &body).unwrap();
    out
}

/// Unicast datagram from a station on the local link.
pub fn unicast(apdu: &[u8]) -> Vec<u8> {
    datagram(BvlcFunction::OriginalUnicastNpdu, Npdu::new(0), apdu)
}

pub fn broadcast(npdu: Npdu, apdu: &[u8]) -> Vec<u8> {
    datagram(BvlcFunction::OriginalBroadcastNpdu, npdu, apdu)
}

pub fn i_am(instance: u32) -> Vec<u8> {
    apdu(|w| {
        IAmRequest {
            device_id: ObjectId::new(ObjectType::Device, instance),
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation,
            vendor_id: 260,
        }
        .encode(w)
        .unwrap()
    })
}
