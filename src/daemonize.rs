//! Double-fork daemonization, ported from `daemonize()`
//! (`examples/original_source/commoner.c:2384-2431`). Must run before the X
//! connection and GPU context are established — neither survives a `fork`
//! cleanly, and the intermediate parent exits immediately.

use std::os::unix::io::RawFd;

use crate::error::InitError;

pub fn daemonize() -> Result<(), InitError> {
    first_fork()?;
    create_session()?;
    second_fork()?;
    chdir_root()?;
    redirect_standard_fds()?;
    Ok(())
}

fn first_fork() -> Result<(), InitError> {
    match unsafe { libc::fork() } {
        -1 => Err(InitError::Daemonize(std::io::Error::last_os_error())),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}

fn create_session() -> Result<(), InitError> {
    if unsafe { libc::setsid() } < 0 {
        return Err(InitError::Daemonize(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn second_fork() -> Result<(), InitError> {
    match unsafe { libc::fork() } {
        -1 => Err(InitError::Daemonize(std::io::Error::last_os_error())),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}

fn chdir_root() -> Result<(), InitError> {
    let root = std::ffi::CString::new("/").unwrap();
    if unsafe { libc::chdir(root.as_ptr()) } < 0 {
        return Err(InitError::Daemonize(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn redirect_standard_fds() -> Result<(), InitError> {
    let devnull = std::ffi::CString::new("/dev/null").unwrap();
    let fd: RawFd = unsafe { libc::open(devnull.as_ptr(), libc::O_RDWR) };
    if fd == -1 {
        return Ok(());
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
