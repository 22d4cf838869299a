use std::convert::Infallible;

use warp::{
    filters::BoxedFilter,
    http::Method,
    hyper::body::Bytes,
    reject::Rejection,
    reply::Response,
    Filter, Reply,
};

use crate::{
    actions::engagement::Marker,
    constants::MAX_BODY_SIZE,
    filters::QueryParams,
    middleware::{with_context, with_possible_session, Context},
    permissions::Permission,
    schema::{Id, User},
};

use super::{auth, catalog, recipes, rejection::handle_rejection, users};

/// Account actions that stay closed.
const BLOCKED_USER_ACTIONS: &[&str] = &[
    "activation",
    "resend_activation",
    "reset_password",
    "reset_password_confirm",
    "set_email",
    "reset_email",
    "reset_email_confirm",
];

fn with_query() -> impl Filter<Extract = (QueryParams,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>().map(QueryParams::new)
}

fn with_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::bytes())
}

fn post_or_delete() -> impl Filter<Extract = (Method,), Error = Rejection> + Clone {
    warp::post()
        .or(warp::delete())
        .unify()
        .and(warp::method())
}

fn recipe_routes(context: Context) -> BoxedFilter<(Response,)> {
    let session = with_possible_session(context.clone());
    let ctx = with_context(context);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::path::full())
        .and(with_query())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(recipes::list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(session.clone())
        .and(with_body())
        .and(ctx.clone())
        .and_then(recipes::create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(recipes::download_shopping_cart);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(recipes::get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(session.clone())
        .and(with_body())
        .and(ctx.clone())
        .and_then(recipes::update_recipe);

    let replace = warp::path!("recipes" / Id)
        .and(warp::put())
        .and(session.clone())
        .and_then(|_id: Id, user: Option<User>| recipes::replace_recipe(user));

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(recipes::delete_recipe);

    let favorite = warp::path!("recipes" / Id / "favorite")
        .and(post_or_delete())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(|id: Id, method: Method, user: Option<User>, context: Context| {
            recipes::toggle_marker(Marker::Favorite, method, id, user, context)
        });

    let cart = warp::path!("recipes" / Id / "shopping_cart")
        .and(post_or_delete())
        .and(session)
        .and(ctx)
        .and_then(|id: Id, method: Method, user: Option<User>, context: Context| {
            recipes::toggle_marker(Marker::Cart, method, id, user, context)
        });

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(replace)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(cart)
        .unify()
        .boxed()
}

fn catalog_routes(context: Context) -> BoxedFilter<(Response,)> {
    let session = with_possible_session(context.clone());
    let ctx = with_context(context);

    let tags = warp::path!("tags")
        .and(warp::get())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(catalog::list_tags);

    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(catalog::get_tag);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_query())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(catalog::list_ingredients);

    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(session)
        .and(ctx)
        .and_then(catalog::get_ingredient);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

fn user_routes(context: Context) -> BoxedFilter<(Response,)> {
    let session = with_possible_session(context.clone());
    let ctx = with_context(context);

    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::path::full())
        .and(with_query())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(users::list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(session.clone())
        .and(with_body())
        .and(ctx.clone())
        .and_then(users::register);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(users::me);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(session.clone())
        .and(with_body())
        .and(ctx.clone())
        .and_then(users::set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::path::full())
        .and(with_query())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(users::subscriptions);

    let blocked = warp::path!("users" / String)
        .and_then(|action: String| async move {
            match BLOCKED_USER_ACTIONS.contains(&action.as_str()) {
                true => Ok(()),
                false => Err(warp::reject::not_found()),
            }
        })
        .untuple_one()
        .and(warp::post())
        .and(warp::method())
        .and(session.clone())
        .and_then(|method: Method, user: Option<User>| {
            users::refuse(Permission::Blocked, method, user)
        });

    let retrieve = warp::path!("users" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(ctx.clone())
        .and_then(users::get_user);

    let edit = warp::path!("users" / Id)
        .and(warp::put().or(warp::patch()).unify())
        .and(warp::method())
        .and(session.clone())
        .and_then(|_id: Id, method: Method, user: Option<User>| {
            users::refuse(Permission::ReadOnly, method, user)
        });

    let delete = warp::path!("users" / Id)
        .and(warp::delete())
        .and(warp::method())
        .and(session.clone())
        .and_then(|_id: Id, method: Method, user: Option<User>| {
            users::refuse(Permission::Blocked, method, user)
        });

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(post_or_delete())
        .and(with_query())
        .and(session)
        .and(ctx)
        .and_then(
            |id: Id, method: Method, query: QueryParams, user: Option<User>, context: Context| {
                users::subscribe(method, id, query, user, context)
            },
        );

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(blocked)
        .unify()
        .or(retrieve)
        .unify()
        .or(edit)
        .unify()
        .or(delete)
        .unify()
        .or(subscribe)
        .unify()
        .boxed()
}

fn auth_routes(context: Context) -> BoxedFilter<(Response,)> {
    let session = with_possible_session(context.clone());
    let ctx = with_context(context);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(session.clone())
        .and(with_body())
        .and(ctx.clone())
        .and_then(auth::login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(session)
        .and(ctx)
        .and_then(auth::logout);

    login.or(logout).unify().boxed()
}

/// Every endpoint under `/api/` plus stored media under `/media/`.
pub fn routes(context: Context) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let media_root = context.config.media_root.clone();

    let api = warp::path("api").and(
        recipe_routes(context.clone())
            .or(catalog_routes(context.clone()))
            .unify()
            .or(user_routes(context.clone()))
            .unify()
            .or(auth_routes(context))
            .unify(),
    );

    let media = warp::path("media")
        .and(warp::fs::dir(media_root))
        .map(|file: warp::fs::File| file.into_response());

    api.or(media)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram::api"))
}
