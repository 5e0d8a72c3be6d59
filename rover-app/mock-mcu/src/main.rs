//! Host-side simulation of the rover MCU.
//!
//! Runs the command core against console-logging servo and LED drivers,
//! with UDP datagrams on a TUN/TAP interface standing in for the wireless
//! link: a 3-byte datagram is a raw command frame, a JSON datagram is either
//! a `SystemCommand` for direct actuator injection or a `{"l":_,"r":_,"m":_}`
//! stick frame routed through the normal frame intake.

use core::cell::RefCell;
use std::convert::Infallible;

use clap::Parser;
use embassy_executor::{Executor, Spawner};
use embassy_net::udp::{PacketMetadata, UdpMetadata, UdpSocket};
use embassy_net::{Config, IpAddress, Ipv4Address, Ipv4Cidr, Runner, StackResources};
use embassy_net_tuntap::TunTapDevice;
use embedded_hal::i2c::{I2c, Operation};
use heapless::Vec;
use rand_core::{OsRng, TryRngCore};
use rover_core::mk_static;
use rover_core::utils::connection::link::{push_frame, PeerAddr, FRAME_LEN};
use rover_core::utils::controllers::leds::LedModule;
use rover_core::utils::controllers::{SystemCommand, LED_CHANNEL, SERVO_CHANNEL};
use rover_core::utils::{CommandLink, SystemController};
use serde::Deserialize;
use smart_leds_trait::{SmartLedsWrite, RGB8};
use static_cell::StaticCell;
use tracing::{error, info};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// TAP device name
    #[clap(long, default_value = "tap0")]
    tap: String,
    /// use a static IP instead of DHCP
    #[clap(long)]
    static_ip: bool,
    /// UDP port to listen on for command frames
    #[clap(long, default_value_t = 4210)]
    port: u16,
}

/// Human-friendly JSON form of a raw command frame.
#[derive(Debug, Deserialize)]
struct StickFrame {
    l: u8,
    r: u8,
    m: u8,
}

/// I2C bus stand-in that logs traffic instead of talking to hardware.
struct ConsoleI2c;

impl embedded_hal::i2c::ErrorType for ConsoleI2c {
    type Error = Infallible;
}

impl I2c for ConsoleI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => info!("i2c write @0x{:02X}: {:02X?}", address, bytes),
                Operation::Read(buffer) => {
                    buffer.fill(0);
                    info!("i2c read @0x{:02X}: {} bytes", address, buffer.len());
                }
            }
        }
        Ok(())
    }
}

/// LED driver that logs colors to the console.
struct SerialLedDriver;

impl SmartLedsWrite for SerialLedDriver {
    type Color = RGB8;
    type Error = Infallible;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        for c in iterator {
            let c: RGB8 = c.into();
            info!("LED: {:?}", c);
        }
        Ok(())
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, TunTapDevice>) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn servo_task(mut ctrl: SystemController<ConsoleI2c>) -> ! {
    ctrl.servo_ch().await
}

#[embassy_executor::task]
async fn led_task(mut leds: LedModule<SerialLedDriver>) -> ! {
    if let Err(e) = leds.startup_sequence().await {
        error!("LED startup sequence failed: {:?}", e);
    }
    loop {
        let cmd = LED_CHANNEL.receiver().receive().await;
        if let Err(e) = leds.ex_command(cmd) {
            error!("LED command failed: {:?}", e);
        }
    }
}

#[embassy_executor::task]
async fn link_task() -> ! {
    let mut link = CommandLink::new();
    link.run().await
}

/// Synthesize a 6-byte link address from the datagram origin.
fn peer_addr(meta: &UdpMetadata) -> PeerAddr {
    let ip = match meta.endpoint.addr {
        IpAddress::Ipv4(v4) => v4.octets(),
    };
    let port = meta.endpoint.port.to_be_bytes();
    [ip[0], ip[1], ip[2], ip[3], port[0], port[1]]
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();

    // Actuation stack over the console drivers.
    let i2c_bus = mk_static!(RefCell<ConsoleI2c>, RefCell::new(ConsoleI2c));
    let sys_ctrl = SystemController::new(i2c_bus);
    spawner.spawn(servo_task(sys_ctrl)).unwrap();

    let leds = LedModule::new(SerialLedDriver);
    spawner.spawn(led_task(leds)).unwrap();
    spawner.spawn(link_task()).unwrap();

    // Network stack over TUN/TAP.
    let device = TunTapDevice::new(&opts.tap).unwrap();
    let config = if opts.static_ip {
        Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: Ipv4Cidr::new(Ipv4Address::new(192, 168, 69, 2), 24),
            dns_servers: Vec::new(),
            gateway: Some(Ipv4Address::new(192, 168, 69, 1)),
        })
    } else {
        Config::dhcpv4(Default::default())
    };
    let mut seed_buf = [0u8; 8];
    OsRng.try_fill_bytes(&mut seed_buf).unwrap();
    let seed = u64::from_le_bytes(seed_buf);

    let resources = mk_static!(StackResources<3>, StackResources::<3>::new());
    let (stack, runner) = embassy_net::new(device, config, resources, seed);
    spawner.spawn(net_task(runner)).unwrap();

    info!("Waiting for the network to come up...");
    stack.wait_config_up().await;
    if let Some(ip_cfg) = stack.config_v4() {
        info!(
            "Listening for command datagrams at {}:{}",
            ip_cfg.address, opts.port
        );
    }

    let mut rx_meta = [PacketMetadata::EMPTY; 16];
    let mut rx_buffer = [0; 4096];
    let mut tx_meta = [PacketMetadata::EMPTY; 16];
    let mut tx_buffer = [0; 4096];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(opts.port).unwrap();

    let mut buf = [0u8; 256];
    loop {
        let (n, meta) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!("UDP receive failed: {:?}", e);
                continue;
            }
        };
        let peer = peer_addr(&meta);
        let payload = &buf[..n];

        if n == FRAME_LEN {
            push_frame(peer, payload);
            continue;
        }

        match serde_json::from_slice::<SystemCommand>(payload) {
            Ok(SystemCommand::S(cmd)) => SERVO_CHANNEL.send(cmd).await,
            Ok(SystemCommand::L(cmd)) => LED_CHANNEL.send(cmd).await,
            Err(_) => match serde_json::from_slice::<StickFrame>(payload) {
                Ok(frame) => {
                    push_frame(peer, &[frame.l, frame.r, frame.m]);
                }
                Err(error) => error!(?error, "unrecognized datagram"),
            },
        }
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner)).unwrap();
    });
}
