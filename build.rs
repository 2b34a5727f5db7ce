fn main() {
    // ESP-IDF environment is only needed when flashing the device.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
