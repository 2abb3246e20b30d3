use core::future::Future;
use std::{
    collections::BTreeMap,
    io,
    path::PathBuf,
    string::{String, ToString},
    vec::Vec,
    };
use serial2_tokio::{SerialPort, CharSize, StopBits, Parity};
use tokio::io::{AsyncRead, AsyncWrite};
use log::*;


/**
    way of opening the byte stream of a link

    the link calls [open](Self::open) again each time the stream closes
*/
pub trait Connector: Send + Sync + 'static {
    type Port: AsyncRead + AsyncWrite + Send + 'static;
    /// open the device
    fn open(&self) -> impl Future<Output = io::Result<Self::Port>> + Send;
    /// list devices this connector could open
    fn discover(&self) -> io::Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// serial device, raw 8 bits, no parity, one stop bit
#[derive(Clone, Debug)]
pub struct Serial {
    pub path: PathBuf,
    pub baud_rate: u32,
}
impl Serial {
    /// serial device at 115200 bauds
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {path: path.into(), baud_rate: 115_200}
    }
    pub fn with_baud_rate(self, baud_rate: u32) -> Self {
        Self {baud_rate, .. self}
    }
}
impl Connector for Serial {
    type Port = SerialPort;

    async fn open(&self) -> io::Result<SerialPort> {
        debug!("opening serial device {}", self.path.display());
        SerialPort::open(&self.path, |mut settings: serial2_tokio::Settings| {
            settings.set_raw();
            settings.set_baud_rate(self.baud_rate)?;
            settings.set_char_size(CharSize::Bits8);
            settings.set_stop_bits(StopBits::One);
            settings.set_parity(Parity::None);
            Ok(settings)
            })
    }
    fn discover(&self) -> io::Result<Vec<PathBuf>> {
        SerialPort::available_ports()
    }
}

/// ports the connector can see right now, by file name
pub(crate) fn snapshot<C: Connector>(connector: &C) -> BTreeMap<String, PathBuf> {
    match connector.discover() {
        Ok(paths) => paths.into_iter()
            .map(|path| {
                let name = path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                (name, path)
                })
            .collect(),
        Err(error) => {
            warn!("cannot list serial ports: {}", error);
            BTreeMap::new()
        },
    }
}
