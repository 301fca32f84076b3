fn main() {
    procard_app_lib::run()
}
