use super::host::HostContext;

pub fn interrupt<H: HostContext + ?Sized>(host: &H) {
    host.interrupt();
}

pub fn terminate<H: HostContext + ?Sized>(host: &H) {
    host.close_input();
}
