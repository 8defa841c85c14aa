use crate::buffer::BufferPool;
use crate::dispatch::Dispatcher;
use crate::tsm::Tsm;
use crate::utsm::{Manager, SubscriberFilter};
use crate::{ClientConfig, ClientDataValue, ClientError, DiscoveredDevice};
use bacip_core::apdu::Apdu;
use bacip_core::encoding::{reader::Reader, writer::Writer};
use bacip_core::npdu::Npdu;
use bacip_core::services::i_am::IAmRequest;
use bacip_core::services::read_property::{
    ReadPropertyAck, ReadPropertyRequest, SERVICE_READ_PROPERTY,
};
use bacip_core::services::read_property_multiple::{
    PropertyReference, ReadAccessSpecification, ReadPropertyMultipleAck,
    ReadPropertyMultipleRequest, ReadResult, SERVICE_READ_PROPERTY_MULTIPLE,
};
use bacip_core::services::who_is::WhoIsRequest;
use bacip_core::services::write_property::{WritePropertyRequest, SERVICE_WRITE_PROPERTY};
use bacip_core::services::write_property_multiple::{
    PropertyWriteSpec, WriteAccessSpecification, WritePropertyMultipleRequest,
    SERVICE_WRITE_PROPERTY_MULTIPLE,
};
use bacip_core::types::{ObjectId, ObjectType, PropertyId};
use bacip_core::EncodeError;
use bacip_datalink::bip::bvlc::{encode_frame, BvlcFunction, BVLC_HEADER_LEN};
use bacip_datalink::{BacnetAddress, BacnetIpTransport, DataLink, DataLinkError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Buffers kept around for reuse by the receive loop.
const IDLE_BUFFERS: usize = 32;

const OBJECT_LIST_PREALLOC: u32 = 256;

/// BACnet/IP client.
///
/// Requests may be issued concurrently from any number of tasks; replies are
/// matched by invoke id. Nothing is received until [`run`](Self::run) (or
/// [`start`](Self::start)) is driving the socket.
#[derive(Debug)]
pub struct BacnetClient<D: DataLink> {
    datalink: Arc<D>,
    config: ClientConfig,
    tsm: Tsm,
    discovery: Manager<DiscoveredDevice>,
    dispatcher: Dispatcher,
    buffers: Arc<BufferPool>,
    in_flight: Arc<Semaphore>,
}

impl<D: DataLink> Clone for BacnetClient<D> {
    fn clone(&self) -> Self {
        Self {
            datalink: self.datalink.clone(),
            config: self.config,
            tsm: self.tsm.clone(),
            discovery: self.discovery.clone(),
            dispatcher: self.dispatcher.clone(),
            buffers: self.buffers.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl BacnetClient<BacnetIpTransport> {
    /// Binds `port` on every interface and broadcasts to the network given
    /// in CIDR form, e.g. `"192.168.23.1/24"`.
    pub async fn new(cidr: &str, port: u16) -> Result<Self, ClientError> {
        let datalink = BacnetIpTransport::bind_cidr(cidr, port).await?;
        Ok(Self::with_datalink(datalink))
    }
}

impl<D: DataLink> BacnetClient<D> {
    pub fn with_datalink(datalink: D) -> Self {
        Self::with_config(datalink, ClientConfig::default())
    }

    pub fn with_config(datalink: D, config: ClientConfig) -> Self {
        // Deserialized configs skip the builders' floors.
        let config = config
            .with_max_frame_len(config.max_frame_len)
            .with_max_in_flight(config.max_in_flight);
        let tsm = Tsm::new(config.transaction_pool_size);
        let discovery = Manager::new(config.subscriber_config());
        Self {
            datalink: Arc::new(datalink),
            dispatcher: Dispatcher::new(tsm.clone(), discovery.clone()),
            tsm,
            discovery,
            buffers: Arc::new(BufferPool::new(config.max_frame_len, IDLE_BUFFERS)),
            in_flight: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn datalink(&self) -> &D {
        &self.datalink
    }

    pub fn tsm(&self) -> &Tsm {
        &self.tsm
    }

    pub fn discovery(&self) -> &Manager<DiscoveredDevice> {
        &self.discovery
    }

    /// Receives datagrams until the data link is closed, handing each one
    /// to its own task.
    ///
    /// Returns `Ok(())` after [`close`](Self::close) and the transport error
    /// for any other receive failure.
    pub async fn run(&self) -> Result<(), ClientError> {
        log::debug!("receive loop started");
        loop {
            let mut buf = self.buffers.take();
            let (n, source) = match self.datalink.recv(&mut buf).await {
                Ok(received) => received,
                Err(DataLinkError::Closed) => {
                    log::debug!("receive loop stopped");
                    return Ok(());
                }
                Err(err) => {
                    log::error!("receive loop failed: {err}");
                    return Err(err.into());
                }
            };

            let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
                log::warn!(
                    "dropping {n}-byte datagram from {source}: {} handlers busy",
                    self.config.max_in_flight
                );
                self.buffers.give_back(buf);
                continue;
            };

            buf.truncate(n);
            let dispatcher = self.dispatcher.clone();
            let buffers = self.buffers.clone();
            tokio::spawn(async move {
                if let Err(err) = dispatcher.dispatch(source, &buf) {
                    log::warn!("dropping datagram from {source}: {err}");
                }
                buffers.give_back(buf);
                drop(permit);
            });
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn start(&self) -> JoinHandle<Result<(), ClientError>>
    where
        D: 'static,
    {
        let client = self.clone();
        tokio::spawn(async move { client.run().await })
    }

    /// Wraps an encoded NPDU and APDU in a BVLC header and transmits it.
    pub async fn send(
        &self,
        destination: &BacnetAddress,
        npdu: &Npdu,
        data: &[u8],
    ) -> Result<usize, ClientError> {
        let mut frame = vec![0u8; BVLC_HEADER_LEN + data.len()];
        let mut w = Writer::new(&mut frame);
        encode_frame(&mut w, BvlcFunction::original_for(destination), data)?;
        Ok(self.datalink.send(&frame, npdu, destination).await?)
    }

    /// Stops [`run`](Self::run) and flushes the log.
    pub fn close(&self) -> Result<(), ClientError> {
        self.datalink.close()?;
        log::logger().flush();
        Ok(())
    }

    fn encode_npdu<F>(&self, npdu: &Npdu, encode: F) -> Result<Vec<u8>, ClientError>
    where
        F: FnOnce(&mut Writer<'_>) -> Result<(), EncodeError>,
    {
        let mut buf = vec![0u8; self.config.max_frame_len.saturating_sub(BVLC_HEADER_LEN)];
        let mut w = Writer::new(&mut buf);
        let written = npdu.encode(&mut w).and_then(|()| encode(&mut w));
        match written {
            Ok(()) => {
                let len = w.as_written().len();
                buf.truncate(len);
                Ok(buf)
            }
            Err(EncodeError::BufferTooSmall) => Err(ClientError::SegmentedRequestTooLarge),
            Err(err) => Err(err.into()),
        }
    }

    /// Sends a confirmed request built by `encode` for the allocated invoke
    /// id and returns the raw reply APDU.
    async fn confirmed<F>(&self, destination: &BacnetAddress, encode: F) -> Result<Vec<u8>, ClientError>
    where
        F: FnOnce(u8, &mut Writer<'_>) -> Result<(), EncodeError>,
    {
        let transaction = self.tsm.allocate()?;
        let invoke_id = transaction.invoke_id();
        let npdu = Npdu::application(true, destination.remote);
        let data = self.encode_npdu(&npdu, |w| encode(invoke_id, w))?;
        self.send(destination, &npdu, &data).await?;
        log::trace!("invoke id {invoke_id} sent to {destination}");
        transaction.wait(self.config.request_timeout).await
    }

    pub async fn read_property(
        &self,
        destination: &BacnetAddress,
        object_id: ObjectId,
        property_id: PropertyId,
        array_index: Option<u32>,
    ) -> Result<ClientDataValue, ClientError> {
        let reply = self
            .confirmed(destination, |invoke_id, w| {
                ReadPropertyRequest {
                    object_id,
                    property_id,
                    array_index,
                    invoke_id,
                }
                .encode(w)
            })
            .await?;
        let payload = complex_ack_payload(&reply, SERVICE_READ_PROPERTY)?;
        let ack = ReadPropertyAck::decode_after_header(&mut Reader::new(payload))?;
        Ok(ack.value.into())
    }

    pub async fn write_property(
        &self,
        destination: &BacnetAddress,
        mut request: WritePropertyRequest<'_>,
    ) -> Result<(), ClientError> {
        let reply = self
            .confirmed(destination, |invoke_id, w| {
                request.invoke_id = invoke_id;
                request.encode(w)
            })
            .await?;
        expect_simple_ack(&reply, SERVICE_WRITE_PROPERTY)
    }

    /// Reads several properties of one object in a single request.
    ///
    /// Properties the device answers with an access error are left out.
    pub async fn read_property_multiple(
        &self,
        destination: &BacnetAddress,
        object_id: ObjectId,
        property_ids: &[PropertyId],
    ) -> Result<Vec<(PropertyId, ClientDataValue)>, ClientError> {
        let refs: Vec<PropertyReference> = property_ids.iter().copied().map(Into::into).collect();
        let specs = [ReadAccessSpecification {
            object_id,
            properties: &refs,
        }];
        let reply = self
            .confirmed(destination, |invoke_id, w| {
                ReadPropertyMultipleRequest {
                    specs: &specs,
                    invoke_id,
                }
                .encode(w)
            })
            .await?;
        let payload = complex_ack_payload(&reply, SERVICE_READ_PROPERTY_MULTIPLE)?;
        let ack = ReadPropertyMultipleAck::decode_after_header(&mut Reader::new(payload))?;

        let mut out = Vec::new();
        for access in ack.results {
            if access.object_id != object_id {
                continue;
            }
            for element in access.results {
                match element.result {
                    ReadResult::Value(value) => out.push((element.property_id, value.into())),
                    ReadResult::Error {
                        error_class,
                        error_code,
                    } => log::debug!(
                        "{object_id} {:?}: error class {error_class} code {error_code}",
                        element.property_id
                    ),
                }
            }
        }
        Ok(out)
    }

    pub async fn write_property_multiple(
        &self,
        destination: &BacnetAddress,
        object_id: ObjectId,
        properties: &[PropertyWriteSpec<'_>],
    ) -> Result<(), ClientError> {
        let specs = [WriteAccessSpecification {
            object_id,
            properties,
        }];
        let reply = self
            .confirmed(destination, |invoke_id, w| {
                WritePropertyMultipleRequest {
                    specs: &specs,
                    invoke_id,
                }
                .encode(w)
            })
            .await?;
        expect_simple_ack(&reply, SERVICE_WRITE_PROPERTY_MULTIPLE)
    }

    /// Every entry of a device's object-list, read one index at a time.
    pub async fn objects(
        &self,
        destination: &BacnetAddress,
        device_instance: u32,
    ) -> Result<Vec<ObjectId>, ClientError> {
        let device = ObjectId::new(ObjectType::Device, device_instance);
        let count = self
            .read_property(destination, device, PropertyId::ObjectList, Some(0))
            .await?
            .as_unsigned()
            .ok_or(ClientError::UnsupportedResponse)?;

        // The count comes from the device; don't size memory by it.
        let mut objects = Vec::with_capacity(count.min(OBJECT_LIST_PREALLOC) as usize);
        for index in 1..=count {
            let object = self
                .read_property(destination, device, PropertyId::ObjectList, Some(index))
                .await?
                .as_object_id()
                .ok_or(ClientError::UnsupportedResponse)?;
            objects.push(object);
        }
        Ok(objects)
    }

    /// Broadcasts a Who-Is and collects the devices that answer.
    ///
    /// Collection stops after `wait`, or earlier when the discovery
    /// subscription runs out. Each device instance appears once.
    pub async fn who_is(
        &self,
        range: Option<(u32, u32)>,
        wait: Duration,
    ) -> Result<Vec<DiscoveredDevice>, ClientError> {
        let (request, filter) = match range {
            Some((low, high)) => (WhoIsRequest::range(low, high), SubscriberFilter::Range(low..=high)),
            None => (WhoIsRequest::global(), SubscriberFilter::All),
        };
        let mut subscription = self.discovery.subscribe(filter);

        let destination = BacnetAddress::global_broadcast();
        let npdu = Npdu::application(false, destination.remote);
        let data = self.encode_npdu(&npdu, |w| request.encode(w))?;
        self.send(&destination, &npdu, &data).await?;

        let deadline = Instant::now() + wait;
        let mut seen = HashSet::new();
        let mut devices = Vec::new();
        while let Ok(Some(device)) = tokio::time::timeout_at(deadline, subscription.recv()).await {
            if seen.insert(device.instance()) {
                devices.push(device);
            }
        }
        subscription.unsubscribe();
        log::debug!("who-is found {} devices", devices.len());
        Ok(devices)
    }

    /// Announces this station with an unconfirmed I-Am.
    pub async fn i_am(&self, destination: &BacnetAddress, i_am: &IAmRequest) -> Result<(), ClientError> {
        let npdu = Npdu::application(false, destination.remote);
        let data = self.encode_npdu(&npdu, |w| i_am.encode(w))?;
        self.send(destination, &npdu, &data).await?;
        Ok(())
    }
}

/// Service body of an unsegmented complex-ack for `service_choice`.
fn complex_ack_payload(apdu: &[u8], service_choice: u8) -> Result<&[u8], ClientError> {
    match Apdu::decode(&mut Reader::new(apdu))? {
        Apdu::ComplexAck { header, payload }
            if header.service_choice == service_choice && !header.segmented =>
        {
            Ok(payload)
        }
        other => {
            log::debug!("expected complex-ack for service {service_choice}, got {other:?}");
            Err(ClientError::UnsupportedResponse)
        }
    }
}

fn expect_simple_ack(apdu: &[u8], service_choice: u8) -> Result<(), ClientError> {
    match Apdu::decode(&mut Reader::new(apdu))? {
        Apdu::SimpleAck(ack) if ack.service_choice == service_choice => Ok(()),
        other => {
            log::debug!("expected simple-ack for service {service_choice}, got {other:?}");
            Err(ClientError::UnsupportedResponse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{complex_ack_payload, expect_simple_ack};
    use crate::ClientError;
    use bacip_core::apdu::{ComplexAckHeader, SimpleAck};
    use bacip_core::encoding::writer::Writer;

    #[test]
    fn ack_of_the_wrong_service_is_unsupported() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        SimpleAck {
            invoke_id: 1,
            service_choice: 0x10,
        }
        .encode(&mut w)
        .unwrap();
        assert!(expect_simple_ack(w.as_written(), 0x10).is_ok());
        assert!(matches!(
            expect_simple_ack(w.as_written(), 0x0F),
            Err(ClientError::UnsupportedResponse)
        ));
        assert!(matches!(
            complex_ack_payload(w.as_written(), 0x10),
            Err(ClientError::UnsupportedResponse)
        ));
    }

    #[test]
    fn segmented_complex_ack_is_unsupported() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        ComplexAckHeader {
            segmented: true,
            more_follows: true,
            sequence_number: Some(0),
            proposed_window_size: Some(1),
            ..ComplexAckHeader::new(4, 0x0C)
        }
        .encode(&mut w)
        .unwrap();
        w.write_all(&[0x0C, 0x02]).unwrap();
        assert!(matches!(
            complex_ack_payload(w.as_written(), 0x0C),
            Err(ClientError::UnsupportedResponse)
        ));
    }
}
