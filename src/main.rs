// VibraWatch — Firmware Entry Point
//
// Boot sequence:
//   1. Park buzzer, LED and relay in a safe (off) state.
//   2. Bring up the shared I2C bus and the character LCD.
//   3. Initialise the MPU6050 — without it the device refuses to run and
//      sounds the fatal alarm forever.
//   4. Set up the LDR ADC channel (a failure only blanks the lux metric).
//   5. Join Wi-Fi (a failure is retried by the scheduler).
//   6. Hand everything to the poll scheduler and loop forever.

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{OutputPin, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

    use vibrawatch::alert;
    use vibrawatch::config::*;
    use vibrawatch::display::FeedbackDisplay;
    use vibrawatch::drivers::buzzer::BuzzerLed;
    use vibrawatch::drivers::imu::Mpu6050;
    use vibrawatch::drivers::lcd::CharLcd;
    use vibrawatch::drivers::ldr::Ldr;
    use vibrawatch::drivers::sensors::SensorSuite;
    use vibrawatch::drivers::SharedBus;
    use vibrawatch::net::http::HttpChannel;
    use vibrawatch::net::wifi::WifiManager;
    use vibrawatch::reading::{format_serial, LdrModel};
    use vibrawatch::scheduler::{MonitorState, Phase, Scheduler};

    pub fn start() -> anyhow::Result<()> {
        let peripherals = Peripherals::take()?;

        // The HTTP client and JSON encoding need more stack than the main task has.
        thread::Builder::new()
            .name("monitor".into())
            .stack_size(STACK_MONITOR)
            .spawn(move || {
                if let Err(e) = run(peripherals) {
                    log::error!("Monitor setup failed: {:?} — restarting", e);
                    thread::sleep(Duration::from_secs(5));
                    esp_idf_hal::reset::restart();
                }
            })?;

        Ok(())
    }

    fn run(peripherals: Peripherals) -> anyhow::Result<()> {
        let pins = peripherals.pins;

        // ---- Outputs ------------------------------------------------------
        let led = PinDriver::output(pins.gpio15.downgrade_output())?;
        let relay = PinDriver::output(pins.gpio32.downgrade_output())?;
        let mut buzzer = BuzzerLed::new(led, relay)?;

        // ---- I2C bus (shared between LCD and MPU6050) ----------------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            pins.gpio21, // SDA
            pins.gpio22, // SCL
            &i2c_config,
        )?;
        // The bus lives for the entire programme (firmware never exits).
        let i2c_bus: SharedBus = Box::leak(Box::new(Mutex::new(i2c)));

        // ---- Display ------------------------------------------------------
        let mut lcd = CharLcd::new(i2c_bus, SELECTED_LCD);
        if let Err(e) = lcd.init() {
            log::error!("LCD init failed: {} — continuing on console only", e);
        }
        lcd.write(0, 0, "Starting...");
        thread::sleep(Duration::from_millis(LCD_SPLASH_MS));
        lcd.clear();

        // ---- IMU (mandatory) ----------------------------------------------
        lcd.write(0, 0, "Init MPU6050...");
        let imu = Mpu6050::new(i2c_bus);
        if let Err(e) = imu.init() {
            log::error!("MPU6050 init failed: {}", e);
            lcd.write(0, 1, "MPU6050 FAILED!");
            alert::halt_forever(&mut buzzer);
        }
        lcd.write(0, 1, "MPU6050 OK!");
        thread::sleep(Duration::from_millis(BOOT_STEP_DISPLAY_MS));

        // ---- LDR ----------------------------------------------------------
        let ldr = match Ldr::new(LdrModel::default()) {
            Ok(ldr) => Some(ldr),
            Err(e) => {
                log::error!("LDR init failed: {} — lux will be unavailable", e);
                None
            }
        };

        // ---- Wi-Fi --------------------------------------------------------
        lcd.write(0, 0, "Connecting WiFi...");
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;
        let wifi = BlockingWifi::wrap(
            EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
            sys_loop,
        )?;
        let mut wifi = WifiManager::new(wifi);
        wifi.configure(NETWORK_SSID, NETWORK_PASSWORD)?;
        match wifi.connect() {
            Ok(()) => lcd.write(0, 0, "WiFi connected!"),
            Err(e) => {
                log::warn!("{}", e);
                lcd.write(0, 0, "WiFi failed!");
            }
        }

        // ---- Scheduler ----------------------------------------------------
        let serial = read_serial();
        log::info!("Chip ID: {}", serial);
        log::info!("API: {}", API_BASE_URL);

        let rows = lcd.rows();
        let channel = HttpChannel::new(wifi, API_BASE_URL);
        let state = MonitorState::new(serial, DEFAULT_THRESHOLDS);
        let mut scheduler = Scheduler::new(SensorSuite::new(imu, ldr), buzzer, lcd, channel, state)
            .with_interval_ms(PRIMARY_INTERVAL_MS)
            .with_display_rows(rows);

        log::info!("Setup complete — entering poll loop");
        thread::sleep(Duration::from_millis(BOOT_STEP_DISPLAY_MS));

        loop {
            if let Phase::Secondary(outcome) = scheduler.tick(vibrawatch::now_ms()) {
                log::debug!("Secondary pass: {:?}", outcome);
                thread::sleep(Duration::from_millis(SECONDARY_DELAY_MS));
            }
        }
    }

    /// Factory MAC from eFuse, as the device serial.
    fn read_serial() -> String {
        let mut mac = [0u8; 6];
        let ret = unsafe { esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
        if ret != esp_idf_sys::ESP_OK {
            log::error!("Could not read eFuse MAC ({})", ret);
        }
        format_serial(mac)
    }
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("=== VibraWatch industrial monitor starting ===");

    firmware::start()?;

    // All work happens in the monitor task — park the main thread forever.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("vibrawatch is ESP-IDF firmware; build it for an ESP32 target (host builds only run the library tests)");
}
