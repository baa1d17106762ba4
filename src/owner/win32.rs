//! Win32 owner lookup: clipboard owner window → process id → image path.

use std::path::Path;

use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, BOOL, HWND};
use windows::Win32::System::DataExchange::GetClipboardOwner;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{GetWindowTextW, GetWindowThreadProcessId};

use super::{push_name, OwnerNames};

pub fn clipboard_owner_names() -> OwnerNames {
    let mut names = OwnerNames::new();

    // SAFETY: plain queries on handles owned by the OS.
    let hwnd = unsafe { GetClipboardOwner() };
    if hwnd == HWND(0) {
        tracing::debug!("Clipboard has no owner window");
        return names;
    }

    if let Some(title) = window_title(hwnd) {
        push_name(&mut names, title);
    }

    let mut pid = 0u32;
    // SAFETY: pid is a valid out-pointer.
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    if pid == 0 {
        return names;
    }

    if let Some(image) = process_image_path(pid) {
        if let Some(file_name) = Path::new(&image).file_name() {
            push_name(&mut names, file_name.to_string_lossy());
        }
    }

    names
}

fn window_title(hwnd: HWND) -> Option<String> {
    let mut buffer = [0u16; 512];
    // SAFETY: buffer outlives the call and its length is passed implicitly.
    let len = unsafe { GetWindowTextW(hwnd, &mut buffer) };
    (len > 0).then(|| String::from_utf16_lossy(&buffer[..len as usize]))
}

fn process_image_path(pid: u32) -> Option<String> {
    // SAFETY: the handle is closed before returning.
    unsafe {
        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), pid).ok()?;
        let mut buffer = [0u16; 1024];
        let mut len = buffer.len() as u32;
        let queried = QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut len,
        );
        CloseHandle(process);
        if !queried.as_bool() {
            tracing::debug!(pid, "QueryFullProcessImageNameW failed");
            return None;
        }
        Some(String::from_utf16_lossy(&buffer[..len as usize]))
    }
}
