//! `--daemon` backgrounding (§4.10). Must run before any async runtime is
//! started: `fork()` only duplicates the calling thread, so a multi-threaded
//! tokio runtime can't survive it. Callers fork first, then build the
//! runtime in the child.

#[cfg(unix)]
pub fn daemonize() -> std::io::Result<()> {
    unsafe {
        match libc::fork() {
            -1 => return Err(std::io::Error::last_os_error()),
            0 => {}
            _parent_pid => std::process::exit(0),
        }

        if libc::setsid() == -1 {
            return Err(std::io::Error::last_os_error());
        }

        redirect_stdio_to_devnull()?;
    }
    Ok(())
}

#[cfg(unix)]
unsafe fn redirect_stdio_to_devnull() -> std::io::Result<()> {
    use std::ffi::CString;

    let devnull = CString::new("/dev/null").expect("no interior nul");
    let fd = unsafe { libc::open(devnull.as_ptr(), libc::O_RDWR) };
    if fd == -1 {
        return Err(std::io::Error::last_os_error());
    }
    unsafe {
        libc::dup2(fd, libc::STDIN_FILENO);
        libc::dup2(fd, libc::STDOUT_FILENO);
        libc::dup2(fd, libc::STDERR_FILENO);
        if fd > 2 {
            libc::close(fd);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize() -> std::io::Result<()> {
    Err(std::io::Error::other("--daemon is only supported on unix platforms"))
}
