fn main() {
    rondo::run();
}
