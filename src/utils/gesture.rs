use gtk4::prelude::GestureSingleExt as _;

pub fn on_enter<F>(on_enter: F) -> gtk4::EventControllerMotion
where
    F: Fn(f64, f64) + 'static,
{
    let controller = gtk4::EventControllerMotion::new();

    controller.connect_enter(move |_, x, y| {
        on_enter(x, y);
    });

    controller
}

pub fn on_leave<F>(on_leave: F) -> gtk4::EventControllerMotion
where
    F: Fn() + 'static,
{
    let controller = gtk4::EventControllerMotion::new();

    controller.connect_leave(move |_| {
        on_leave();
    });

    controller
}

pub fn on_primary_up<F>(on_up: F) -> gtk4::GestureClick
where
    F: Fn(i32, f64, f64) + 'static,
{
    let controller = gtk4::GestureClick::new();
    controller.set_button(gdk4::BUTTON_PRIMARY);
    controller.connect_released(move |_, n_press, x, y| {
        on_up(n_press, x, y);
    });

    controller
}
