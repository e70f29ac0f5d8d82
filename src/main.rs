fn main() -> anyhow::Result<()> {
    realtime_rtc_lib::run()
}
