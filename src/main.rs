#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    winddrawer_desktop_lib::run()
}
