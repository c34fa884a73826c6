pub mod api;
pub mod feed;

use rocket::routes;

pub fn get_routes() -> Vec<rocket::Route> {
    routes![
        api::health_check,
        feed::list_packages,
        feed::find_packages_by_id,
        feed::search,
        feed::record_download,
    ]
}
