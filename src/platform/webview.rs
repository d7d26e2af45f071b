use crate::browser::injection::InjectedPointer;
use crate::browser::{BrowserControl, ContentSource, SyntheticMouseEvent};
use crate::ink::geometry::ClientRect;
use crate::win_util::to_wide;
use anyhow::{anyhow, Context};
use webview2_com::Microsoft::Web::WebView2::Win32::{
    CreateCoreWebView2Environment, ICoreWebView2CompositionController, ICoreWebView2Controller,
    ICoreWebView2Environment, ICoreWebView2Environment3, COREWEBVIEW2_MOUSE_EVENT_KIND,
    COREWEBVIEW2_MOUSE_EVENT_VIRTUAL_KEYS, COREWEBVIEW2_POINTER_EVENT_KIND,
};
use webview2_com::{
    CreateCoreWebView2CompositionControllerCompletedHandler,
    CreateCoreWebView2EnvironmentCompletedHandler, CursorChangedEventHandler,
    NavigationCompletedEventHandler,
};
use windows::core::{Interface, IUnknown, PCWSTR};
use windows::Win32::Foundation::{BOOL, HWND, POINT, RECT};
use windows::Win32::Graphics::DirectComposition::{
    DCompositionCreateDevice2, IDCompositionDevice, IDCompositionTarget, IDCompositionVisual,
};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::UI::WindowsAndMessaging::{SetCursor, HCURSOR};

/// Starts environment creation. `done` runs on the UI thread when it finishes.
pub fn request_environment<F>(done: F) -> anyhow::Result<()>
where
    F: FnOnce(anyhow::Result<ICoreWebView2Environment>) + 'static,
{
    let handler = CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(
        move |result: windows::core::Result<()>, environment: Option<ICoreWebView2Environment>| {
            done(match (result, environment) {
                (Ok(()), Some(environment)) => Ok(environment),
                (Ok(()), None) => Err(anyhow!("environment callback returned no environment")),
                (Err(e), _) => Err(anyhow!(e).context("CreateCoreWebView2Environment failed")),
            });
            Ok(())
        },
    ));
    unsafe { CreateCoreWebView2Environment(&handler) }
        .context("CreateCoreWebView2Environment could not start")
}

/// Starts composition-controller creation for `hwnd`.
pub fn request_controller<F>(
    environment: ICoreWebView2Environment,
    hwnd: HWND,
    done: F,
) -> anyhow::Result<()>
where
    F: FnOnce(anyhow::Result<Box<dyn BrowserControl>>) + 'static,
{
    let env3: ICoreWebView2Environment3 = environment
        .cast()
        .context("runtime does not support composition controllers")?;
    let callback_env = env3.clone();
    let handler = CreateCoreWebView2CompositionControllerCompletedHandler::create(Box::new(
        move |result: windows::core::Result<()>,
              controller: Option<ICoreWebView2CompositionController>| {
            let control = match (result, controller) {
                (Ok(()), Some(controller)) => WebViewControl::new(controller, callback_env, hwnd)
                    .map(|c| Box::new(c) as Box<dyn BrowserControl>),
                (Ok(()), None) => Err(anyhow!("controller callback returned no controller")),
                (Err(e), _) => Err(anyhow!(e).context("composition controller creation failed")),
            };
            done(control);
            Ok(())
        },
    ));
    unsafe { env3.CreateCoreWebView2CompositionController(hwnd, &handler) }
        .context("CreateCoreWebView2CompositionController could not start")
}

/// WebView2 composition controller rendered into a DirectComposition visual
/// of the host window.
pub struct WebViewControl {
    hwnd: HWND,
    composition: ICoreWebView2CompositionController,
    controller: ICoreWebView2Controller,
    environment: ICoreWebView2Environment3,
    device: IDCompositionDevice,
    _target: IDCompositionTarget,
    _visual: IDCompositionVisual,
}

impl WebViewControl {
    fn new(
        composition: ICoreWebView2CompositionController,
        environment: ICoreWebView2Environment3,
        hwnd: HWND,
    ) -> anyhow::Result<Self> {
        let controller: ICoreWebView2Controller = composition.cast()?;
        unsafe {
            let device: IDCompositionDevice =
                DCompositionCreateDevice2(None::<&IUnknown>).context("DirectComposition device")?;
            let target = device.CreateTargetForHwnd(hwnd, BOOL::from(false))?;
            let visual = device.CreateVisual()?;
            target.SetRoot(&visual)?;
            composition.SetRootVisualTarget(&visual)?;
            device.Commit()?;

            let mut token = Default::default();
            composition.add_CursorChanged(
                &CursorChangedEventHandler::create(Box::new(|sender, _| {
                    let Some(sender) = sender else {
                        return Ok(());
                    };
                    let mut cursor = HCURSOR::default();
                    sender.Cursor(&mut cursor)?;
                    SetCursor(cursor);
                    Ok(())
                })),
                &mut token,
            )?;

            let webview = controller.CoreWebView2()?;
            let mut token = Default::default();
            webview.add_NavigationCompleted(
                &NavigationCompletedEventHandler::create(Box::new(|_, args| {
                    if let Some(args) = args {
                        let mut success = BOOL::default();
                        args.IsSuccess(&mut success)?;
                        if success.as_bool() {
                            tracing::info!("navigation completed");
                        } else {
                            tracing::warn!("navigation failed");
                        }
                    }
                    Ok(())
                })),
                &mut token,
            )?;

            Ok(Self {
                hwnd,
                composition,
                controller,
                environment,
                device,
                _target: target,
                _visual: visual,
            })
        }
    }

    fn screen_rect(&self, bounds: ClientRect) -> RECT {
        let mut origin = POINT {
            x: bounds.x,
            y: bounds.y,
        };
        unsafe {
            let _ = ClientToScreen(self.hwnd, &mut origin);
        }
        RECT {
            left: origin.x,
            top: origin.y,
            right: origin.x + bounds.width,
            bottom: origin.y + bounds.height,
        }
    }
}

fn to_rect(bounds: ClientRect) -> RECT {
    RECT {
        left: bounds.x,
        top: bounds.y,
        right: bounds.right(),
        bottom: bounds.bottom(),
    }
}

impl BrowserControl for WebViewControl {
    fn set_bounds(&mut self, bounds: ClientRect) -> anyhow::Result<()> {
        unsafe {
            self.controller.SetBounds(to_rect(bounds))?;
            self.device.Commit()?;
        }
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> anyhow::Result<()> {
        unsafe { self.controller.SetIsVisible(BOOL::from(visible))? };
        Ok(())
    }

    fn navigate(&mut self, content: &ContentSource) -> anyhow::Result<()> {
        let webview = unsafe { self.controller.CoreWebView2()? };
        match content {
            ContentSource::Url(url) => {
                let wide = to_wide(url);
                unsafe { webview.Navigate(PCWSTR(wide.as_ptr()))? };
            }
            ContentSource::Html(html) => {
                let wide = to_wide(html);
                unsafe { webview.NavigateToString(PCWSTR(wide.as_ptr()))? };
            }
        }
        Ok(())
    }

    fn send_mouse_input(&mut self, event: &SyntheticMouseEvent) -> anyhow::Result<()> {
        unsafe {
            self.composition.SendMouseInput(
                COREWEBVIEW2_MOUSE_EVENT_KIND(event.kind.code()),
                COREWEBVIEW2_MOUSE_EVENT_VIRTUAL_KEYS(event.keys.0),
                event.mouse_data as u32,
                POINT {
                    x: event.point.x,
                    y: event.point.y,
                },
            )?;
        }
        Ok(())
    }

    fn send_pointer_input(&mut self, pointer: InjectedPointer) -> anyhow::Result<()> {
        let bounds = unsafe {
            let mut rect = RECT::default();
            self.controller.Bounds(&mut rect)?;
            ClientRect::from_edges(rect.left, rect.top, rect.right, rect.bottom)
        };
        let display = self.screen_rect(bounds);
        let location = POINT {
            x: pointer.location.x,
            y: pointer.location.y,
        };
        unsafe {
            let info = self.environment.CreateCoreWebView2PointerInfo()?;
            info.SetPointerKind(pointer.kind.input_type())?;
            info.SetPointerId(pointer.pointer_id)?;
            info.SetPointerFlags(pointer.flags.0)?;
            info.SetPixelLocation(location)?;
            info.SetPixelLocationRaw(location)?;
            info.SetPointerDeviceRect(display)?;
            info.SetDisplayRect(display)?;
            if let Some(pressure) = pointer.pressure {
                info.SetPenPressure(pressure)?;
            }
            self.composition
                .SendPointerInput(COREWEBVIEW2_POINTER_EVENT_KIND(pointer.event.code()), &info)?;
        }
        Ok(())
    }
}
