#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;

#[app(device = stm32_metapac, peripherals = false)]
mod app {
    use core::net::{Ipv4Addr, SocketAddrV4};

    use cortex_m::asm;
    use defmt::{error, info, warn};
    use embassy_stm32::gpio::{Level, Output, Speed};
    use embassy_stm32::mode::Blocking;
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;

    use wiznode::{beacon, BeaconConfig, MacAddr, NetInfo, SocketBuffers, SocketId};
    use wiznode::{SpiTransport, W5500};

    // Node identity and greeting target; every value is fixed at build
    // time, nothing is negotiated on the network.
    const MAC: MacAddr = MacAddr([0x00, 0x08, 0xdc, 0xab, 0xcd, 0xef]);
    const IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 15);
    const SUBNET: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
    const GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
    const LOCAL_PORT: u16 = 5000;
    const DESTINATION: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 4), 5001);
    const GREETING: &[u8] = b"Hello User";

    type EthTransport = SpiTransport<Spi<'static, Blocking>, Output<'static>>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        chip: W5500<EthTransport>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("UDP beacon starting...");

        // 64 MHz off the internal oscillator: HSI/2 feeds the PLL at
        // 4 MHz, multiplied by 16. AHB /1, APB1 /2 (36 MHz limit), APB2 /1.
        let mut config = embassy_stm32::Config::default();
        {
            use embassy_stm32::rcc::*;
            config.rcc.hsi = true;
            config.rcc.pll = Some(Pll {
                src: PllSource::HSI_DIV2,
                prediv: PllPreDiv::DIV1,
                mul: PllMul::MUL16,
            });
            config.rcc.sys = Sysclk::PLL1_P;
            config.rcc.ahb_pre = AHBPrescaler::DIV1;
            config.rcc.apb1_pre = APBPrescaler::DIV2;
            config.rcc.apb2_pre = APBPrescaler::DIV1;
        }
        let p = embassy_stm32::init(config);
        info!("clock tree up: SYSCLK 64 MHz from HSI/2 x PLL16");

        // SPI1 in controller mode, mode 0, MSB first, 8-bit frames; the
        // /8 prescaler at 64 MHz APB2 gives the chip its 8 MHz clock.
        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(8_000_000);
        let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);

        // PA4 is the software chip select, idle high.
        let cs = Output::new(p.PA4, Level::High, Speed::Low);
        info!("SPI1 up at 8 MHz, chip select on PA4");

        let config = beacon_config();
        let chip = match beacon::bring_up(SpiTransport::new(spi, cs), &config) {
            Ok(chip) => chip,
            Err(e) => {
                error!("offload chip bring-up failed: {:?}", e);
                halt();
            }
        };

        let mac = MAC.octets();
        let ip = IP.octets();
        info!(
            "node {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x} at {}.{}.{}.{}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], ip[0], ip[1], ip[2], ip[3]
        );

        (Shared {}, Local { chip })
    }

    /// Steady state: the greeting loop owns the single execution context.
    #[idle(local = [chip])]
    fn idle(cx: idle::Context) -> ! {
        let config = beacon_config();
        let dest = DESTINATION.ip().octets();
        info!(
            "sending greeting to {}.{}.{}.{}:{} from port {}",
            dest[0],
            dest[1],
            dest[2],
            dest[3],
            DESTINATION.port(),
            LOCAL_PORT
        );

        match beacon::run(cx.local.chip, &config) {
            // The open was rejected; there is nothing to send and nothing
            // to recover. Interrupts stay enabled.
            Ok(()) => warn!("socket 0 refused to open; send path never started"),
            Err(e) => {
                error!("bus fault in send loop: {:?}", e);
                halt();
            }
        }
        loop {
            asm::wfi();
        }
    }

    fn beacon_config() -> BeaconConfig {
        BeaconConfig {
            net: NetInfo {
                mac: MAC,
                ip: IP,
                subnet: SUBNET,
                gateway: GATEWAY,
            },
            buffers: SocketBuffers::uniform(),
            socket: SocketId::default(),
            local_port: LOCAL_PORT,
            destination: DESTINATION,
            payload: GREETING,
        }
    }

    /// Unrecoverable hardware fault: mask interrupts and park the core.
    fn halt() -> ! {
        cortex_m::interrupt::disable();
        loop {
            asm::wfi();
        }
    }
}
