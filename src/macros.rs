macro_rules! cfg_router {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "router")]
            #[cfg_attr(docsrs, doc(cfg(feature = "router")))]
            $item
        )*
    }
}

macro_rules! cfg_host {
    ($($item:item)*) => {
        $(
            #[cfg(not(feature = "router"))]
            $item
        )*
    }
}

macro_rules! cfg_context {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "6co")]
            #[cfg_attr(docsrs, doc(cfg(feature = "6co")))]
            $item
        )*
    }
}
