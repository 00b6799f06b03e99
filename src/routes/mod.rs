pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(users::register)
        .service(users::login)
        .service(users::logout)
        .service(users::logout_all)
        .service(users::me)
        .service(users::update_me)
        .service(users::delete_me)
        .service(users::upload_avatar)
        .service(users::delete_avatar)
        .service(users::get_avatar)
        .service(tasks::create_task)
        .service(tasks::list_tasks)
        .service(tasks::get_task)
        .service(tasks::update_task)
        .service(tasks::delete_task);
}
