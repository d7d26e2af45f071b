use super::webview;
use crate::browser::init::InitEvent;
use crate::browser::injection::InjectionBridge;
use crate::ink::geometry::{ClientRect, DirtyRect, DpiScale};
use crate::ink::model::{Point, PointerKind};
use crate::ink::pointer::{KeyState, PointerButton, PointerPhase, PointerSample};
use crate::ink::render::PaintTarget;
use crate::ink::transparency::{HitTest, InputTransparency, TransparencyConfig, VisualTransparency};
use crate::settings::Settings;
use crate::surface::dispatch::{COMMITTED_ID, HOST_ID, TRANSIENT_ID};
use crate::surface::host::InitRequest;
use crate::surface::{AppContext, Dispatched, SurfaceEvent, SurfaceId, SurfaceRequest};
use crate::win_util::{
    point_from_lparam, pointer_buttons_from_wparam, pointer_flags_from_wparam,
    pointer_id_from_wparam, to_wide, wheel_delta_from_wparam,
};
use anyhow::{anyhow, bail, Context};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;
use webview2_com::Microsoft::Web::WebView2::Win32::ICoreWebView2Environment;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HANDLE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, BitBlt, ClientToScreen, CreateCompatibleDC, CreateDIBSection, DeleteDC,
    DeleteObject, EndPaint, InvalidateRect, ScreenToClient, SelectObject, BITMAPINFO,
    BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, PAINTSTRUCT, SRCCOPY,
};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::HiDpi::{
    GetDpiForSystem, SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture};
use windows::Win32::UI::Input::Pointer::{
    EnableMouseInPointer, GetPointerInfo, GetPointerPenInfo, GetPointerType, POINTER_INFO,
    POINTER_PEN_INFO,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRectEx, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetClientRect, GetMessageW, GetWindowLongPtrW, LoadCursorW, MessageBoxW,
    PostMessageW, PostQuitMessage, RegisterClassW, SetLayeredWindowAttributes,
    SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage, CREATESTRUCTW, CW_USEDEFAULT,
    GWLP_USERDATA, HTCLIENT, HTTRANSPARENT, IDC_ARROW, LWA_ALPHA, LWA_COLORKEY, MB_ICONERROR,
    MB_OK, MSG, POINTER_INPUT_TYPE, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, SW_SHOW,
    SW_SHOWNOACTIVATE,
    WINDOW_EX_STYLE, WM_APP, WM_DESTROY, WM_ERASEBKGND, WM_MOVE, WM_NCCREATE, WM_NCDESTROY,
    WM_NCHITTEST, WM_PAINT, WM_POINTERCAPTURECHANGED, WM_POINTERDOWN, WM_POINTERLEAVE,
    WM_POINTERUP, WM_POINTERUPDATE, WM_POINTERWHEEL, WM_SIZE, WNDCLASSW, WS_CLIPCHILDREN,
    WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT, WS_OVERLAPPEDWINDOW,
    WINDOW_STYLE, WS_POPUP,
};

const WM_APP_INJECT: u32 = WM_APP + 1;
const WM_APP_REDIRECT: u32 = WM_APP + 2;

const HOST_CLASS: &str = "InkLayersHost";
const OVERLAY_CLASS: &str = "InkLayersOverlay";

// POINTER_BUTTON_CHANGE_TYPE values.
const FIRSTBUTTON_DOWN: i32 = 1;
const FIRSTBUTTON_UP: i32 = 2;
const SECONDBUTTON_DOWN: i32 = 3;
const SECONDBUTTON_UP: i32 = 4;
const THIRDBUTTON_DOWN: i32 = 5;
const THIRDBUTTON_UP: i32 = 6;

const POINTER_MOD_SHIFT: u32 = 0x0004;
const POINTER_MOD_CTRL: u32 = 0x0008;

/// Window-long payload linking a window back to its surface.
struct WindowSlot {
    id: SurfaceId,
    shell: Weak<Shell>,
}

struct Shell {
    app: RefCell<AppContext>,
    windows: RefCell<HashMap<SurfaceId, HWND>>,
    dibs: RefCell<HashMap<SurfaceId, Dib>>,
    redirects: RefCell<VecDeque<PointerSample>>,
    last_positions: RefCell<HashMap<u32, (Point, Point)>>,
    show_init_errors: bool,
}

pub fn run(settings: Settings) -> anyhow::Result<()> {
    unsafe {
        if let Err(e) = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) {
            tracing::warn!(error = %e, "per-monitor DPI awareness unavailable");
        }
        CoInitializeEx(None, COINIT_APARTMENTTHREADED)
            .ok()
            .context("COM initialisation failed")?;
        if let Err(e) = EnableMouseInPointer(true) {
            tracing::warn!(error = %e, "mouse input will not arrive as pointer messages");
        }
    }

    let result = run_shell(settings);
    unsafe { CoUninitialize() };
    result
}

fn run_shell(settings: Settings) -> anyhow::Result<()> {
    let host_raw = Arc::new(AtomicIsize::new(0));
    let waker_target = host_raw.clone();
    let bridge = InjectionBridge::new().with_waker(move || {
        let raw = waker_target.load(Ordering::Acquire);
        if raw != 0 {
            unsafe {
                let _ = PostMessageW(HWND(raw as *mut c_void), WM_APP_INJECT, WPARAM(0), LPARAM(0));
            }
        }
    });

    let shell = Rc::new(Shell {
        app: RefCell::new(AppContext::with_injection(&settings, bridge)),
        windows: RefCell::new(HashMap::new()),
        dibs: RefCell::new(HashMap::new()),
        redirects: RefCell::new(VecDeque::new()),
        last_positions: RefCell::new(HashMap::new()),
        show_init_errors: settings.show_init_errors,
    });

    register_classes()?;
    let host = create_host_window(&shell, &settings)?;
    host_raw.store(host.0 as isize, Ordering::Release);
    let committed = create_overlay_window(&shell, COMMITTED_ID, host, settings.committed_transparency)?;
    let transient = create_overlay_window(&shell, TRANSIENT_ID, host, settings.transient_transparency)?;
    unsafe {
        // Keep the ink overlay above the committed one.
        let _ = SetWindowPos(
            committed,
            transient,
            0,
            0,
            0,
            0,
            SWP_NOACTIVATE | SWP_NOMOVE | SWP_NOSIZE,
        );
        let _ = ShowWindow(host, SW_SHOW);
        let _ = ShowWindow(committed, SW_SHOWNOACTIVATE);
        let _ = ShowWindow(transient, SW_SHOWNOACTIVATE);
    }

    shell.resize_from_window(host);
    shell.init_event::<ICoreWebView2Environment>(InitEvent::Start);

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    tracing::info!(strokes = shell.app.borrow().committed_layer().len(), "host window closed");
    Ok(())
}

fn register_classes() -> anyhow::Result<()> {
    let instance = unsafe { GetModuleHandleW(PCWSTR::null()) }?;
    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }?;
    for name in [HOST_CLASS, OVERLAY_CLASS] {
        let class_name = to_wide(name);
        let wc = WNDCLASSW {
            hInstance: instance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            lpfnWndProc: Some(wndproc),
            hCursor: cursor,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            bail!("RegisterClassW failed for {name}");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn create_window(
    shell: &Rc<Shell>,
    id: SurfaceId,
    class: &str,
    title: &str,
    ex_style: WINDOW_EX_STYLE,
    style: WINDOW_STYLE,
    rect: (i32, i32, i32, i32),
    owner: Option<HWND>,
) -> anyhow::Result<HWND> {
    let instance = unsafe { GetModuleHandleW(PCWSTR::null()) }?;
    let class_name = to_wide(class);
    let title = to_wide(title);
    let slot = Box::into_raw(Box::new(WindowSlot {
        id,
        shell: Rc::downgrade(shell),
    }));
    let created = unsafe {
        CreateWindowExW(
            ex_style,
            PCWSTR(class_name.as_ptr()),
            PCWSTR(title.as_ptr()),
            style,
            rect.0,
            rect.1,
            rect.2,
            rect.3,
            owner.unwrap_or_default(),
            None,
            instance,
            Some(slot as *const c_void),
        )
    };
    match created {
        Ok(hwnd) => {
            shell.windows.borrow_mut().insert(id, hwnd);
            Ok(hwnd)
        }
        Err(e) => {
            // WM_NCDESTROY never ran, so the slot is still ours.
            drop(unsafe { Box::from_raw(slot) });
            Err(anyhow!(e).context(format!("CreateWindowExW failed for {class}")))
        }
    }
}

fn create_host_window(shell: &Rc<Shell>, settings: &Settings) -> anyhow::Result<HWND> {
    let scale = DpiScale::from_dpi(unsafe { GetDpiForSystem() });
    let (width, height) = settings.window_size();
    let mut rect = RECT {
        left: 0,
        top: 0,
        right: scale.to_physical(width),
        bottom: scale.to_physical(height),
    };
    unsafe {
        AdjustWindowRectEx(&mut rect, WS_OVERLAPPEDWINDOW, false, WINDOW_EX_STYLE::default())?;
    }
    tracing::info!(scale = scale.factor(), width, height, "creating host window");
    create_window(
        shell,
        HOST_ID,
        HOST_CLASS,
        &settings.title,
        WINDOW_EX_STYLE::default(),
        WS_OVERLAPPEDWINDOW | WS_CLIPCHILDREN,
        (
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            rect.right - rect.left,
            rect.bottom - rect.top,
        ),
        None,
    )
}

fn create_overlay_window(
    shell: &Rc<Shell>,
    id: SurfaceId,
    host: HWND,
    transparency: TransparencyConfig,
) -> anyhow::Result<HWND> {
    let mut ex_style = WS_EX_LAYERED | WS_EX_NOACTIVATE | WS_EX_TOOLWINDOW;
    if transparency.input == InputTransparency::Always {
        ex_style |= WS_EX_TRANSPARENT;
    }
    let hwnd = create_window(shell, id, OVERLAY_CLASS, "", ex_style, WS_POPUP, (0, 0, 0, 0), Some(host))?;
    let (key, alpha, flags) = match transparency.visual {
        VisualTransparency::ColorKey { key } => (COLORREF(key.to_colorref()), 0, LWA_COLORKEY),
        VisualTransparency::Alpha { opacity } => (COLORREF(0), opacity, LWA_ALPHA),
        VisualTransparency::Opaque => (COLORREF(0), 255, LWA_ALPHA),
    };
    if let Err(e) = unsafe { SetLayeredWindowAttributes(hwnd, key, alpha, flags) } {
        unsafe {
            let _ = DestroyWindow(hwnd);
        }
        return Err(anyhow!(e).context("SetLayeredWindowAttributes failed"));
    }
    Ok(hwnd)
}

unsafe extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_NCCREATE {
        let create = lparam.0 as *const CREATESTRUCTW;
        if !create.is_null() {
            let slot = unsafe { (*create).lpCreateParams };
            unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, slot as isize) };
        }
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let slot = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut WindowSlot;
    if slot.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }
    if msg == WM_NCDESTROY {
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            drop(Box::from_raw(slot));
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
    }

    let (id, shell) = {
        let slot = unsafe { &*slot };
        (slot.id, slot.shell.upgrade())
    };
    let handled = shell.and_then(|shell| shell.handle_message(id, hwnd, msg, wparam, lparam));
    handled.unwrap_or_else(|| unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) })
}

impl Shell {
    fn hwnd(&self, id: SurfaceId) -> Option<HWND> {
        self.windows.borrow().get(&id).copied()
    }

    fn handle_message(
        self: &Rc<Self>,
        id: SurfaceId,
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> Option<LRESULT> {
        match msg {
            WM_SIZE if id == HOST_ID => {
                self.resize_from_window(hwnd);
                Some(LRESULT(0))
            }
            WM_MOVE if id == HOST_ID => {
                self.dispatch(id, SurfaceEvent::Moved);
                Some(LRESULT(0))
            }
            WM_DESTROY if id == HOST_ID => {
                unsafe { PostQuitMessage(0) };
                Some(LRESULT(0))
            }
            WM_APP_INJECT if id == HOST_ID => {
                let sent = self.app.borrow_mut().drain_injections();
                tracing::debug!(sent, "submitted injected pointers");
                Some(LRESULT(0))
            }
            WM_APP_REDIRECT if id == HOST_ID => {
                let next = self.redirects.borrow_mut().pop_front();
                if let Some(sample) = next {
                    self.dispatch(HOST_ID, SurfaceEvent::Pointer(sample));
                }
                Some(LRESULT(0))
            }
            WM_ERASEBKGND if id != HOST_ID => Some(LRESULT(1)),
            WM_PAINT if id != HOST_ID => {
                self.paint(id, hwnd);
                Some(LRESULT(0))
            }
            WM_NCHITTEST if id != HOST_ID => {
                let screen = point_from_lparam(lparam.0);
                let mut point = POINT {
                    x: screen.x,
                    y: screen.y,
                };
                unsafe {
                    let _ = ScreenToClient(hwnd, &mut point);
                }
                let result = self
                    .app
                    .borrow_mut()
                    .dispatch(id, SurfaceEvent::HitTest(Point::new(point.x, point.y)));
                match result {
                    Dispatched::HitTest(HitTest::Transparent) => Some(LRESULT(HTTRANSPARENT as isize)),
                    Dispatched::HitTest(HitTest::Client) => Some(LRESULT(HTCLIENT as isize)),
                    Dispatched::Done | Dispatched::UnknownSurface => None,
                }
            }
            WM_POINTERDOWN | WM_POINTERUPDATE | WM_POINTERUP | WM_POINTERLEAVE
            | WM_POINTERCAPTURECHANGED | WM_POINTERWHEEL => {
                let pointer_id = pointer_id_from_wparam(wparam.0);
                let last = self.last_positions.borrow().get(&pointer_id).copied();
                let sample = decode_pointer(hwnd, msg, wparam, lparam, last)?;
                self.remember_position(&sample);
                let injectable = matches!(sample.kind, PointerKind::Pen | PointerKind::Touch)
                    && !matches!(sample.phase, PointerPhase::Wheel { .. });
                if id == HOST_ID && injectable {
                    // Built off-thread and submitted when WM_APP_INJECT drains the bridge.
                    if let Err(e) = self.app.borrow().inject_from_worker(&sample) {
                        tracing::debug!(error = %e, "pointer not handed to the injection worker");
                    }
                } else {
                    self.dispatch(id, SurfaceEvent::Pointer(sample));
                }
                Some(LRESULT(0))
            }
            _ => None,
        }
    }

    fn remember_position(&self, sample: &PointerSample) {
        let mut positions = self.last_positions.borrow_mut();
        match sample.phase {
            PointerPhase::Up | PointerPhase::Leave | PointerPhase::CaptureLost => {
                positions.remove(&sample.id);
            }
            _ => {
                positions.insert(sample.id, (sample.position, sample.screen));
            }
        }
    }

    fn resize_from_window(self: &Rc<Self>, hwnd: HWND) {
        let mut rect = RECT::default();
        if unsafe { GetClientRect(hwnd, &mut rect) }.is_err() {
            return;
        }
        let client = ClientRect::from_edges(rect.left, rect.top, rect.right, rect.bottom);
        self.dispatch(HOST_ID, SurfaceEvent::Resized(client));
    }

    fn dispatch(self: &Rc<Self>, id: SurfaceId, event: SurfaceEvent) {
        let requests = {
            let mut app = self.app.borrow_mut();
            app.dispatch(id, event);
            app.take_requests()
        };
        self.apply(requests);
    }

    fn init_event(self: &Rc<Self>, event: InitEvent<ICoreWebView2Environment>) {
        let (request, requests) = {
            let mut app = self.app.borrow_mut();
            let request = app.handle_init(event);
            (request, app.take_requests())
        };
        self.apply(requests);

        let Some(host) = self.hwnd(HOST_ID) else {
            return;
        };
        let weak = Rc::downgrade(self);
        let started = match request {
            None => return,
            Some(InitRequest::Environment) => webview::request_environment(move |result| {
                if let Some(shell) = weak.upgrade() {
                    shell.init_event(InitEvent::EnvironmentCreated(result));
                }
            })
            .map_err(|e| (e, true)),
            Some(InitRequest::Controller(environment)) => {
                webview::request_controller(environment, host, move |result| {
                    if let Some(shell) = weak.upgrade() {
                        shell.init_event(InitEvent::ControllerCreated(result));
                    }
                })
                .map_err(|e| (e, false))
            }
        };
        if let Err((error, environment)) = started {
            let event = if environment {
                InitEvent::EnvironmentCreated(Err(error))
            } else {
                InitEvent::ControllerCreated(Err(error))
            };
            self.init_event(event);
        }
    }

    fn apply(self: &Rc<Self>, requests: Vec<SurfaceRequest>) {
        for request in requests {
            match request {
                SurfaceRequest::Invalidate { surface, rect } => {
                    let Some(hwnd) = self.hwnd(surface) else { continue };
                    let rect = rect.map(|r| RECT {
                        left: r.x,
                        top: r.y,
                        right: r.x + r.width,
                        bottom: r.y + r.height,
                    });
                    unsafe {
                        let _ = InvalidateRect(hwnd, rect.as_ref().map(|r| r as *const RECT), false);
                    }
                }
                SurfaceRequest::CapturePointer { surface, pointer_id } => {
                    if let Some(hwnd) = self.hwnd(surface) {
                        tracing::trace!(pointer_id, "capturing pointer");
                        unsafe {
                            let _ = SetCapture(hwnd);
                        }
                    }
                }
                SurfaceRequest::ReleasePointer { pointer_id, .. } => {
                    tracing::trace!(pointer_id, "releasing pointer");
                    unsafe {
                        let _ = ReleaseCapture();
                    }
                }
                SurfaceRequest::Reposition { surface, bounds } => self.reposition(surface, bounds),
                SurfaceRequest::Redirect { sample } => {
                    self.redirects.borrow_mut().push_back(sample);
                    if let Some(host) = self.hwnd(HOST_ID) {
                        unsafe {
                            let _ = PostMessageW(host, WM_APP_REDIRECT, WPARAM(0), LPARAM(0));
                        }
                    }
                }
                SurfaceRequest::InitFailed { stage, message } => {
                    if self.show_init_errors {
                        let text = to_wide(&format!("Could not create the {stage}.\n\n{message}"));
                        let caption = to_wide("WebView2 initialization failed");
                        unsafe {
                            MessageBoxW(
                                self.hwnd(HOST_ID).unwrap_or_default(),
                                PCWSTR(text.as_ptr()),
                                PCWSTR(caption.as_ptr()),
                                MB_OK | MB_ICONERROR,
                            );
                        }
                    }
                }
            }
        }
    }

    fn reposition(&self, surface: SurfaceId, bounds: ClientRect) {
        let (Some(host), Some(hwnd)) = (self.hwnd(HOST_ID), self.hwnd(surface)) else {
            return;
        };
        let mut origin = POINT {
            x: bounds.x,
            y: bounds.y,
        };
        unsafe {
            let _ = ClientToScreen(host, &mut origin);
            let _ = SetWindowPos(
                hwnd,
                HWND::default(),
                origin.x,
                origin.y,
                bounds.width,
                bounds.height,
                SWP_NOACTIVATE | SWP_NOZORDER,
            );
        }
    }

    fn paint(&self, id: SurfaceId, hwnd: HWND) {
        let mut client = RECT::default();
        unsafe {
            let _ = GetClientRect(hwnd, &mut client);
        }
        let size = (
            (client.right - client.left).max(0) as u32,
            (client.bottom - client.top).max(0) as u32,
        );

        let mut ps = PAINTSTRUCT::default();
        let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
        if !hdc.0.is_null() && size.0 > 0 && size.1 > 0 {
            let mut dibs = self.dibs.borrow_mut();
            let needs_new = dibs.get(&id).map_or(true, |dib| dib.size != size);
            if needs_new {
                dibs.remove(&id);
                match Dib::new(size) {
                    Ok(dib) => {
                        dibs.insert(id, dib);
                    }
                    Err(e) => tracing::warn!(error = %e, "could not allocate overlay bitmap"),
                }
            }
            if let Some(dib) = dibs.get_mut(&id) {
                let rect = DirtyRect {
                    x: ps.rcPaint.left,
                    y: ps.rcPaint.top,
                    width: ps.rcPaint.right - ps.rcPaint.left,
                    height: ps.rcPaint.bottom - ps.rcPaint.top,
                };
                // A fresh bitmap has no previous contents to keep.
                let dirty = if needs_new { None } else { Some(rect) };
                self.app.borrow_mut().paint(id, dib, dirty);
                unsafe {
                    let _ = BitBlt(
                        hdc,
                        ps.rcPaint.left,
                        ps.rcPaint.top,
                        rect.width,
                        rect.height,
                        dib.dc,
                        ps.rcPaint.left,
                        ps.rcPaint.top,
                        SRCCOPY,
                    );
                }
            }
        }
        unsafe {
            let _ = EndPaint(hwnd, &ps);
        }
    }
}

/// `last` is the pointer's previous (client, screen) position. Capture loss
/// still yields a sample when the pointer is already gone from the system.
fn decode_pointer(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    last: Option<(Point, Point)>,
) -> Option<PointerSample> {
    let pointer_id = pointer_id_from_wparam(wparam.0);
    let phase = match msg {
        WM_POINTERDOWN => PointerPhase::Down,
        WM_POINTERUPDATE => PointerPhase::Update,
        WM_POINTERUP => PointerPhase::Up,
        WM_POINTERLEAVE => PointerPhase::Leave,
        WM_POINTERCAPTURECHANGED => PointerPhase::CaptureLost,
        WM_POINTERWHEEL => PointerPhase::Wheel {
            delta: wheel_delta_from_wparam(wparam.0),
        },
        _ => return None,
    };
    let capture_lost = phase == PointerPhase::CaptureLost;

    let mut input_type = POINTER_INPUT_TYPE::default();
    let kind = match unsafe { GetPointerType(pointer_id, &mut input_type) } {
        Ok(()) => PointerKind::from_input_type(input_type.0 as u32),
        Err(_) if capture_lost => PointerKind::Unknown,
        Err(e) => {
            tracing::trace!(pointer_id, error = %e, "pointer type unavailable");
            return None;
        }
    };

    let mut info = POINTER_INFO::default();
    let info = unsafe { GetPointerInfo(pointer_id, &mut info) }.ok().map(|_| info);

    // The capture-changed LPARAM is a window handle, not a point.
    let (client, screen) = match &info {
        Some(info) => to_client(hwnd, Point::new(info.ptPixelLocation.x, info.ptPixelLocation.y)),
        None if capture_lost => last.unwrap_or_default(),
        None => to_client(hwnd, point_from_lparam(lparam.0)),
    };

    let mut sample = PointerSample::new(pointer_id, kind, phase, client).with_screen(screen);
    sample.flags = pointer_flags_from_wparam(wparam.0);
    sample.pressed = pointer_buttons_from_wparam(wparam.0);
    if let Some(info) = &info {
        sample.button = match info.ButtonChangeType.0 {
            FIRSTBUTTON_DOWN | FIRSTBUTTON_UP => PointerButton::Primary,
            SECONDBUTTON_DOWN | SECONDBUTTON_UP => PointerButton::Secondary,
            THIRDBUTTON_DOWN | THIRDBUTTON_UP => PointerButton::Middle,
            _ => sample.button,
        };
        sample.keys = KeyState {
            shift: info.dwKeyStates & POINTER_MOD_SHIFT != 0,
            ctrl: info.dwKeyStates & POINTER_MOD_CTRL != 0,
        };
    }
    if kind == PointerKind::Pen {
        let mut pen = POINTER_PEN_INFO::default();
        if unsafe { GetPointerPenInfo(pointer_id, &mut pen) }.is_ok() {
            sample = sample.with_pressure(pen.pressure);
        }
    }
    Some(sample)
}

fn to_client(hwnd: HWND, screen: Point) -> (Point, Point) {
    let mut client = POINT {
        x: screen.x,
        y: screen.y,
    };
    unsafe {
        let _ = ScreenToClient(hwnd, &mut client);
    }
    (Point::new(client.x, client.y), screen)
}

/// 32-bit top-down DIB selected into a memory DC.
struct Dib {
    dc: HDC,
    bitmap: HBITMAP,
    old: HGDIOBJ,
    bits: *mut u8,
    size: (u32, u32),
}

impl Dib {
    fn new(size: (u32, u32)) -> anyhow::Result<Self> {
        let dc = unsafe { CreateCompatibleDC(HDC::default()) };
        if dc.0.is_null() {
            bail!("CreateCompatibleDC failed");
        }
        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader = BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: size.0 as i32,
            biHeight: -(size.1 as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };
        let mut bits: *mut c_void = ptr::null_mut();
        let bitmap = match unsafe {
            CreateDIBSection(dc, &bmi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
        } {
            Ok(bitmap) if !bits.is_null() => bitmap,
            Ok(_) | Err(_) => {
                unsafe {
                    let _ = DeleteDC(dc);
                }
                bail!("CreateDIBSection failed for {}x{}", size.0, size.1);
            }
        };
        let old = unsafe { SelectObject(dc, bitmap) };
        Ok(Self {
            dc,
            bitmap,
            old,
            bits: bits as *mut u8,
            size,
        })
    }
}

impl PaintTarget for Dib {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn bgra_mut(&mut self) -> &mut [u8] {
        let len = (self.size.0 as usize) * (self.size.1 as usize) * 4;
        unsafe { std::slice::from_raw_parts_mut(self.bits, len) }
    }
}

impl Drop for Dib {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc, self.old);
            let _ = DeleteObject(self.bitmap);
            let _ = DeleteDC(self.dc);
        }
    }
}
