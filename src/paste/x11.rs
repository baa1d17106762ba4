//! X11 paste: XTest fake key events, falling back to `xdotool`.

use std::os::raw::{c_int, c_uint};
use std::process::Command;
use std::ptr;

use anyhow::{anyhow, bail, Context};
use tracing::debug;
use x11_dl::{keysym, xlib, xtest};

pub fn send_paste() -> anyhow::Result<()> {
    match send_with_xtest() {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(error = %e, "XTest paste failed, falling back to xdotool");
            send_with_xdotool()
        }
    }
}

fn send_with_xtest() -> anyhow::Result<()> {
    let xlib = xlib::Xlib::open().map_err(|e| anyhow!("libX11: {}", e))?;
    let xtest = xtest::Xf86vmode::open().map_err(|e| anyhow!("libXtst: {}", e))?;

    // SAFETY: display is checked for null and closed on every path below.
    unsafe {
        let display = (xlib.XOpenDisplay)(ptr::null());
        if display.is_null() {
            bail!("cannot open X display");
        }

        let control = (xlib.XKeysymToKeycode)(display, keysym::XK_Control_L as xlib::KeySym);
        let v = (xlib.XKeysymToKeycode)(display, keysym::XK_v as xlib::KeySym);
        if control == 0 || v == 0 {
            (xlib.XCloseDisplay)(display);
            bail!("no keycode for Control_L or v");
        }

        let mut sent = true;
        for (keycode, press) in [(control, true), (v, true), (v, false), (control, false)] {
            sent &= (xtest.XTestFakeKeyEvent)(
                display,
                c_uint::from(keycode),
                c_int::from(press),
                0,
            ) != 0;
        }
        (xlib.XFlush)(display);
        (xlib.XCloseDisplay)(display);

        if !sent {
            bail!("XTestFakeKeyEvent rejected an event");
        }
    }
    Ok(())
}

fn send_with_xdotool() -> anyhow::Result<()> {
    let output = Command::new("xdotool")
        .args(["key", "--delay", "100", "ctrl+v"])
        .output()
        .context("xdotool not available")?;

    if !output.status.success() {
        bail!(
            "xdotool exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
